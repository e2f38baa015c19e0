// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Quad real-time core.
//!
//! This crate provides the shared error type, domain types, the transport
//! wire protocol, and the collaborator traits (persistence, directory,
//! clock) that the presence, messaging, call, and escalation crates are
//! built on.

pub mod connection;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use connection::{ConnectionHandle, EventReceiver};
pub use error::QuadError;
pub use events::{ClientEvent, EndReason, ServerEvent};
pub use types::{
    CallId, CallStatus, CallType, ConnectionId, EscalationEntry, EscalationLevel, Issue,
    IssueId, IssueStatus, Message, MessageId, MessageStatus, Role, UserId,
};

pub use traits::{Clock, Directory, IssueStore, MessageStore, SystemClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_error_has_all_variants() {
        let _offline = QuadError::UserOffline {
            user_id: UserId::from("u1"),
        };
        let _busy = QuadError::UserBusy {
            user_id: UserId::from("u1"),
        };
        let _in_call = QuadError::AlreadyInCall {
            user_id: UserId::from("u1"),
        };
        let _no_call = QuadError::NoActiveCall {
            user_id: UserId::from("u1"),
        };
        let _forbidden = QuadError::Forbidden("nope".into());
        let _not_found = QuadError::NotFound {
            kind: "message",
            id: "m1".into(),
        };
        let _persist = QuadError::PersistenceFailure {
            source: Box::new(std::io::Error::other("disk")),
        };
        let _signal = QuadError::SignalingProtocol("missing signal".into());
        let _skip = QuadError::SchedulerSkip("no director".into());
        let _transport = QuadError::Transport("closed".into());
        let _config = QuadError::Config("bad".into());
        let _transition = QuadError::InvalidTransition {
            from: "read".into(),
            to: "sent".into(),
        };
        let _internal = QuadError::Internal("bug".into());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_message_store<T: MessageStore>() {}
        fn _assert_issue_store<T: IssueStore>() {}
        fn _assert_directory<T: Directory>() {}
        fn _assert_clock<T: Clock>() {}
        _assert_clock::<SystemClock>();
    }
}
