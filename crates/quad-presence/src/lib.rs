// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-to-connection registry and presence fan-out.
//!
//! The [`ConnectionRegistry`] is the single source of truth for whether a
//! user is reachable. The [`PresenceBroadcaster`] wraps it so every
//! registry mutation that changes presence is announced to the other
//! connected users.

pub mod broadcaster;
pub mod registry;

pub use broadcaster::PresenceBroadcaster;
pub use registry::{ConnectionEntry, ConnectionRegistry, Registration};
