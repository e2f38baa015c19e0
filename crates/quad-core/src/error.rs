// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Quad real-time core.

use thiserror::Error;

use crate::events::ServerEvent;
use crate::types::UserId;

/// The error type shared by every component of the real-time core.
#[derive(Debug, Error)]
pub enum QuadError {
    /// Target user has no live connection.
    #[error("user {user_id} is offline")]
    UserOffline { user_id: UserId },

    /// Callee is already party to another call session.
    #[error("user {user_id} is busy on another call")]
    UserBusy { user_id: UserId },

    /// Caller is already party to a call session.
    #[error("user {user_id} is already in a call")]
    AlreadyInCall { user_id: UserId },

    /// An operation that needs a call session found none for this user.
    #[error("user {user_id} has no active call")]
    NoActiveCall { user_id: UserId },

    /// The acting party has no rights over the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Downstream store error (database, serialization).
    #[error("persistence failure: {source}")]
    PersistenceFailure {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Malformed signaling payload (missing required field).
    #[error("signaling protocol error: {0}")]
    SignalingProtocol(String),

    /// Soft scheduler condition that is logged and skipped.
    #[error("scheduler skip: {0}")]
    SchedulerSkip(String),

    /// The transport connection went away mid-emit.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A state transition that would move a status backwards.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuadError {
    /// Shorthand for wrapping any store error.
    pub fn persistence(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        QuadError::PersistenceFailure { source: err.into() }
    }

    /// Maps an error caused by a client intent onto the event sent back to
    /// that client's own connection.
    pub fn to_event(&self) -> ServerEvent {
        match self {
            QuadError::UserOffline { user_id } => ServerEvent::CallUserOffline {
                user_id: Some(user_id.clone()),
            },
            QuadError::UserBusy { user_id } => ServerEvent::UserBusy {
                user_id: Some(user_id.clone()),
                message: self.to_string(),
            },
            QuadError::AlreadyInCall { .. }
            | QuadError::NoActiveCall { .. }
            | QuadError::SignalingProtocol(_) => ServerEvent::CallError {
                message: self.to_string(),
            },
            other => ServerEvent::Error {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_maps_to_user_offline_event() {
        let err = QuadError::UserOffline {
            user_id: UserId::from("bob"),
        };
        assert_eq!(
            err.to_event(),
            ServerEvent::CallUserOffline {
                user_id: Some(UserId::from("bob"))
            }
        );
    }

    #[test]
    fn busy_maps_to_user_busy_event() {
        let err = QuadError::UserBusy {
            user_id: UserId::from("bob"),
        };
        match err.to_event() {
            ServerEvent::UserBusy { user_id, message } => {
                assert_eq!(user_id, Some(UserId::from("bob")));
                assert!(message.contains("busy"));
            }
            other => panic!("expected user-busy, got {other:?}"),
        }
    }

    #[test]
    fn signaling_errors_map_to_call_error() {
        for err in [
            QuadError::AlreadyInCall {
                user_id: UserId::from("a"),
            },
            QuadError::SignalingProtocol("missing signalData".into()),
        ] {
            assert!(matches!(err.to_event(), ServerEvent::CallError { .. }));
        }
    }

    #[test]
    fn forbidden_maps_to_generic_error() {
        let err = QuadError::Forbidden("not the receiver".into());
        match err.to_event() {
            ServerEvent::Error { message } => assert!(message.contains("not the receiver")),
            other => panic!("expected error event, got {other:?}"),
        }
    }
}
