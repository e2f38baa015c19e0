// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live call sessions and the per-user association table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use quad_core::{CallId, CallStatus, CallType, QuadError, UserId};

/// A call that is ringing, connecting, or connected.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSession {
    pub call_id: CallId,
    pub caller_id: UserId,
    pub receiver_id: UserId,
    pub call_type: CallType,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    /// Distinguishes repeated calls between the same pair.
    pub attempt: u64,
}

impl CallSession {
    /// The participant that is not `user`.
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        if user == &self.caller_id {
            Some(&self.receiver_id)
        } else if user == &self.receiver_id {
            Some(&self.caller_id)
        } else {
            None
        }
    }
}

/// Sessions keyed by call id, with one association per participant.
///
/// Both participants point at the same session, so either side can resolve
/// it. A user is associated with at most one session.
#[derive(Debug, Default)]
pub struct CallTable {
    sessions: HashMap<CallId, CallSession>,
    by_user: HashMap<UserId, CallId>,
    attempts: u64,
}

impl CallTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ringing session between `caller` and `receiver`.
    ///
    /// Fails with `AlreadyInCall` if the caller is busy and `UserBusy` if the
    /// receiver is. Nothing is inserted on failure.
    pub fn open(
        &mut self,
        caller: &UserId,
        receiver: &UserId,
        call_type: CallType,
        at: DateTime<Utc>,
    ) -> Result<CallSession, QuadError> {
        if self.by_user.contains_key(caller) {
            return Err(QuadError::AlreadyInCall {
                user_id: caller.clone(),
            });
        }
        if self.by_user.contains_key(receiver) {
            return Err(QuadError::UserBusy {
                user_id: receiver.clone(),
            });
        }
        self.attempts += 1;
        let session = CallSession {
            call_id: CallId::for_pair(caller, receiver),
            caller_id: caller.clone(),
            receiver_id: receiver.clone(),
            call_type,
            status: CallStatus::Ringing,
            started_at: at,
            connected_at: None,
            attempt: self.attempts,
        };
        self.by_user.insert(caller.clone(), session.call_id.clone());
        self.by_user
            .insert(receiver.clone(), session.call_id.clone());
        self.sessions
            .insert(session.call_id.clone(), session.clone());
        Ok(session)
    }

    /// A session by id.
    pub fn get(&self, call_id: &CallId) -> Option<&CallSession> {
        self.sessions.get(call_id)
    }

    /// The session `user` is party to.
    pub fn session_for(&self, user: &UserId) -> Option<&CallSession> {
        self.by_user.get(user).and_then(|id| self.sessions.get(id))
    }

    pub fn session_for_mut(&mut self, user: &UserId) -> Option<&mut CallSession> {
        let id = self.by_user.get(user)?;
        self.sessions.get_mut(id)
    }

    /// Removes the session `user` is party to, clearing both associations.
    pub fn close_for(&mut self, user: &UserId) -> Option<CallSession> {
        let id = self.by_user.get(user)?.clone();
        self.close(&id)
    }

    /// Removes a session by id, clearing both associations.
    pub fn close(&mut self, call_id: &CallId) -> Option<CallSession> {
        let session = self.sessions.remove(call_id)?;
        self.by_user.remove(&session.caller_id);
        self.by_user.remove(&session.receiver_id);
        Some(session)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(table: &mut CallTable, a: &str, b: &str) -> Result<CallSession, QuadError> {
        table.open(&a.into(), &b.into(), CallType::Audio, Utc::now())
    }

    #[test]
    fn one_session_per_user() {
        let mut table = CallTable::new();
        open(&mut table, "a", "b").unwrap();

        assert!(matches!(
            open(&mut table, "a", "c"),
            Err(QuadError::AlreadyInCall { .. })
        ));
        assert!(matches!(
            open(&mut table, "c", "b"),
            Err(QuadError::UserBusy { .. })
        ));
        assert_eq!(table.len(), 1);
        assert!(table.session_for(&"c".into()).is_none());
    }

    #[test]
    fn both_sides_resolve_and_close_together() {
        let mut table = CallTable::new();
        let session = open(&mut table, "a", "b").unwrap();
        assert_eq!(table.session_for(&"b".into()), Some(&session));
        assert_eq!(session.peer_of(&"b".into()), Some(&"a".into()));
        assert_eq!(session.peer_of(&"z".into()), None);

        let closed = table.close_for(&"b".into()).unwrap();
        assert_eq!(closed.call_id, session.call_id);
        assert!(table.session_for(&"a".into()).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn repeated_calls_get_new_attempts() {
        let mut table = CallTable::new();
        let first = open(&mut table, "a", "b").unwrap();
        table.close(&first.call_id);
        let second = open(&mut table, "a", "b").unwrap();
        assert_eq!(first.call_id, second.call_id);
        assert_ne!(first.attempt, second.attempt);
    }
}
