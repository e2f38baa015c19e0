// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call signaling coordinator.
//!
//! Owns the call-session state machine, enforces one active call per user,
//! and relays opaque session-description and ICE payloads between exactly
//! two parties.

pub mod coordinator;
pub mod session;

pub use coordinator::CallCoordinator;
pub use session::{CallSession, CallTable};
