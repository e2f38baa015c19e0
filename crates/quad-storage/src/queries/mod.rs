// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules grouped by table.

pub mod issues;
pub mod messages;
pub mod users;
