// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the real-time core.
//!
//! Persistence and directory lookups are fallible, awaitable operations with
//! no internal retry. The clock is injectable so tests can simulate elapsed
//! time without waiting.

pub mod clock;
pub mod directory;
pub mod issues;
pub mod messages;

pub use clock::{Clock, SystemClock};
pub use directory::Directory;
pub use issues::IssueStore;
pub use messages::MessageStore;
