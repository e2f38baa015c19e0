// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the real-time core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::QuadError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identity of an authenticated user.
    UserId
);
string_id!(
    /// Identity of one live transport connection.
    ConnectionId
);
string_id!(
    /// Unique identifier for a message.
    MessageId
);
string_id!(
    /// Unique identifier for a reported issue.
    IssueId
);
string_id!(
    /// Identifier of a call session, derived from the caller/callee pair.
    CallId
);

impl ConnectionId {
    /// Generates a fresh random connection id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl MessageId {
    /// Generates a fresh random message id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl CallId {
    /// Derives the call id for a caller/callee pair.
    pub fn for_pair(caller: &UserId, callee: &UserId) -> Self {
        Self(format!("{caller}->{callee}"))
    }
}

/// Delivery status of a message.
///
/// `Sending -> Sent -> Delivered -> Read` is strictly ordered. `Failed` is
/// only reachable from `Sending` and is terminal: a retry produces a new
/// message rather than resurrecting the failed one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Position on the forward path. `Failed` sits outside it.
    pub fn rank(self) -> Option<u8> {
        match self {
            MessageStatus::Sending => Some(0),
            MessageStatus::Sent => Some(1),
            MessageStatus::Delivered => Some(2),
            MessageStatus::Read => Some(3),
            MessageStatus::Failed => None,
        }
    }

    /// Whether moving from `self` to `next` keeps the status monotonic.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        match (self, next) {
            (MessageStatus::Sending, MessageStatus::Failed) => true,
            (MessageStatus::Failed, _) | (_, MessageStatus::Failed) => false,
            (MessageStatus::Sending, MessageStatus::Delivered | MessageStatus::Read) => false,
            (from, to) => match (from.rank(), to.rank()) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Read | MessageStatus::Failed)
    }
}

/// A direct message between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: String,
    #[serde(default)]
    pub media: Vec<String>,
    pub status: MessageStatus,
    #[serde(default)]
    pub issue_id: Option<IssueId>,
    #[serde(default)]
    pub is_original_issue_message: bool,
    #[serde(default)]
    pub auto_forwarded: bool,
    #[serde(default)]
    pub forward_count: u32,
    #[serde(default)]
    pub original_message_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new message in the `sending` state.
    pub fn new(
        sender_id: UserId,
        receiver_id: UserId,
        text: impl Into<String>,
        media: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            sender_id,
            receiver_id,
            text: text.into(),
            media,
            status: MessageStatus::Sending,
            issue_id: None,
            is_original_issue_message: false,
            auto_forwarded: false,
            forward_count: 0,
            original_message_id: None,
            created_at,
        }
    }

    /// Creates the forwarded copy of `original` addressed to `to`.
    ///
    /// The copy keeps the original sender and issue tag, and points at the
    /// root of the forwarding chain.
    pub fn forwarded_from(original: &Message, to: UserId, created_at: DateTime<Utc>) -> Self {
        let mut copy = Message::new(
            original.sender_id.clone(),
            to,
            original.text.clone(),
            original.media.clone(),
            created_at,
        );
        copy.issue_id = original.issue_id.clone();
        copy.auto_forwarded = true;
        copy.forward_count = original.forward_count + 1;
        copy.original_message_id = Some(
            original
                .original_message_id
                .clone()
                .unwrap_or_else(|| original.id.clone()),
        );
        copy
    }

    /// Moves the status forward, rejecting regressions.
    pub fn advance(&mut self, next: MessageStatus) -> Result<(), QuadError> {
        if !self.status.can_advance_to(next) {
            return Err(QuadError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Media kind of a call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CallType {
    Audio,
    Video,
}

/// Lifecycle of a live call session.
///
/// Sessions only exist while non-terminal; `Ended` is reported, never stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CallStatus {
    Ringing,
    Connecting,
    Connected,
    Ended,
}

/// Rung of the responsibility hierarchy an unresolved issue occupies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum EscalationLevel {
    #[serde(rename = "assigned")]
    #[strum(serialize = "assigned")]
    Assigned,
    Director,
    Owner,
}

impl EscalationLevel {
    /// The next rung, or `None` at the top.
    pub fn next(self) -> Option<EscalationLevel> {
        match self {
            EscalationLevel::Assigned => Some(EscalationLevel::Director),
            EscalationLevel::Director => Some(EscalationLevel::Owner),
            EscalationLevel::Owner => None,
        }
    }

    /// Directory role that owns issues at this rung.
    pub fn role(self) -> Option<Role> {
        match self {
            EscalationLevel::Assigned => None,
            EscalationLevel::Director => Some(Role::Director),
            EscalationLevel::Owner => Some(Role::Owner),
        }
    }
}

/// Directory role used to resolve escalation targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Member,
    Director,
    Owner,
}

/// Lifecycle status of a reported issue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl IssueStatus {
    /// Terminal issues are never escalated.
    pub fn is_terminal(self) -> bool {
        matches!(self, IssueStatus::Resolved | IssueStatus::Closed)
    }
}

/// One step recorded in an issue's escalation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationEntry {
    pub level: EscalationLevel,
    pub user_id: UserId,
    pub escalated_at: DateTime<Utc>,
}

/// A reported issue moving through the escalation hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: IssueId,
    pub reporter_id: UserId,
    pub assignee_id: UserId,
    pub status: IssueStatus,
    pub escalation_level: Option<EscalationLevel>,
    pub escalated_at: DateTime<Utc>,
    #[serde(default)]
    pub escalation_history: Vec<EscalationEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn message_status_forward_path() {
        use MessageStatus::*;
        assert!(Sending.can_advance_to(Sent));
        assert!(Sending.can_advance_to(Failed));
        assert!(Sent.can_advance_to(Delivered));
        assert!(Sent.can_advance_to(Read));
        assert!(Delivered.can_advance_to(Read));

        assert!(!Read.can_advance_to(Sent));
        assert!(!Delivered.can_advance_to(Sent));
        assert!(!Sent.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Sending));
        assert!(!Sending.can_advance_to(Delivered));
        assert!(!Read.can_advance_to(Read));
    }

    fn any_status() -> impl Strategy<Value = MessageStatus> {
        prop_oneof![
            Just(MessageStatus::Sending),
            Just(MessageStatus::Sent),
            Just(MessageStatus::Delivered),
            Just(MessageStatus::Read),
            Just(MessageStatus::Failed),
        ]
    }

    proptest! {
        #[test]
        fn applied_transitions_never_regress(steps in proptest::collection::vec(any_status(), 0..20)) {
            let mut msg = Message::new("a".into(), "b".into(), "hi", vec![], t0());
            let mut last_rank = msg.status.rank();
            for step in steps {
                if msg.advance(step).is_ok() {
                    let rank = msg.status.rank();
                    if let (Some(prev), Some(now)) = (last_rank, rank) {
                        prop_assert!(now > prev);
                    }
                    last_rank = rank;
                }
            }
        }
    }

    #[test]
    fn advance_rejects_regression() {
        let mut msg = Message::new("a".into(), "b".into(), "hi", vec![], t0());
        msg.advance(MessageStatus::Sent).unwrap();
        msg.advance(MessageStatus::Read).unwrap();
        let err = msg.advance(MessageStatus::Sent).unwrap_err();
        assert!(matches!(err, QuadError::InvalidTransition { .. }));
        assert_eq!(msg.status, MessageStatus::Read);
    }

    #[test]
    fn forwarded_copy_points_at_root() {
        let mut original = Message::new("reporter".into(), "staff".into(), "broken tap", vec![], t0());
        original.issue_id = Some(IssueId::from("i1"));
        original.is_original_issue_message = true;

        let first = Message::forwarded_from(&original, "director".into(), t0());
        assert!(first.auto_forwarded);
        assert!(!first.is_original_issue_message);
        assert_eq!(first.forward_count, 1);
        assert_eq!(first.original_message_id.as_ref(), Some(&original.id));
        assert_eq!(first.sender_id, original.sender_id);
        assert_eq!(first.status, MessageStatus::Sending);

        let second = Message::forwarded_from(&first, "owner".into(), t0());
        assert_eq!(second.forward_count, 2);
        assert_eq!(second.original_message_id.as_ref(), Some(&original.id));
        assert_eq!(second.issue_id, Some(IssueId::from("i1")));
    }

    #[test]
    fn escalation_level_only_advances() {
        assert_eq!(EscalationLevel::Assigned.next(), Some(EscalationLevel::Director));
        assert_eq!(EscalationLevel::Director.next(), Some(EscalationLevel::Owner));
        assert_eq!(EscalationLevel::Owner.next(), None);
        assert!(EscalationLevel::Assigned < EscalationLevel::Director);
        assert!(EscalationLevel::Director < EscalationLevel::Owner);
    }

    #[test]
    fn escalation_level_string_forms() {
        assert_eq!(EscalationLevel::Assigned.to_string(), "assigned");
        assert_eq!(EscalationLevel::Director.to_string(), "Director");
        assert_eq!(
            EscalationLevel::from_str("Owner").unwrap(),
            EscalationLevel::Owner
        );
        let json = serde_json::to_string(&EscalationLevel::Assigned).unwrap();
        assert_eq!(json, "\"assigned\"");
    }

    #[test]
    fn message_serializes_camel_case() {
        let msg = Message::new("a".into(), "b".into(), "hello", vec![], t0());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["senderId"], "a");
        assert_eq!(json["receiverId"], "b");
        assert_eq!(json["status"], "sending");
        assert_eq!(json["isOriginalIssueMessage"], false);
        assert_eq!(json["forwardCount"], 0);
    }

    #[test]
    fn call_id_is_derived_from_pair() {
        let id = CallId::for_pair(&UserId::from("alice"), &UserId::from("bob"));
        assert_eq!(id.as_str(), "alice->bob");
    }
}
