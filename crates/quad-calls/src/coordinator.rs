// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call setup, teardown, and signaling relay between two connected users.
//!
//! Every check-then-set on the call table happens under one lock, and the
//! lock is never held across an await. Emits are non-blocking, so events
//! produced by one operation reach each connection in order.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use quad_core::events::{AnswerCall, CallTarget, CallUser, IceCandidate};
use quad_core::{
    CallId, CallStatus, CallType, Clock, ConnectionHandle, EndReason, QuadError, ServerEvent,
    UserId,
};
use quad_presence::ConnectionRegistry;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::session::{CallSession, CallTable};

/// Coordinates call sessions between pairs of users.
#[derive(Clone)]
pub struct CallCoordinator {
    registry: Arc<ConnectionRegistry>,
    clock: Arc<dyn Clock>,
    table: Arc<Mutex<CallTable>>,
    ring_timeout: Duration,
}

impl CallCoordinator {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        clock: Arc<dyn Clock>,
        ring_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            clock,
            table: Arc::new(Mutex::new(CallTable::new())),
            ring_timeout,
        }
    }

    fn table(&self) -> MutexGuard<'_, CallTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Places a call from `caller` to `request.user_to_call`.
    ///
    /// Sends `incoming-call` to the callee and `call-ringing` to the caller,
    /// then arms the ring timeout. Must be called inside a Tokio runtime.
    pub fn initiate(&self, caller: &UserId, request: CallUser) -> Result<CallSession, QuadError> {
        let callee = request.user_to_call.ok_or_else(|| {
            QuadError::SignalingProtocol("call-user requires userToCall".to_string())
        })?;
        let signal_data = request.signal_data.ok_or_else(|| {
            QuadError::SignalingProtocol("call-user requires signalData".to_string())
        })?;
        if &callee == caller {
            return Err(QuadError::SignalingProtocol(
                "cannot call yourself".to_string(),
            ));
        }
        let call_type = request.call_type.unwrap_or(CallType::Audio);

        let session = {
            let mut table = self.table();
            if table.session_for(caller).is_some() {
                return Err(QuadError::AlreadyInCall {
                    user_id: caller.clone(),
                });
            }
            let Some(callee_conn) = self.registry.resolve(&callee) else {
                quad_prometheus::record_call("offline");
                return Err(QuadError::UserOffline { user_id: callee });
            };
            let session = table
                .open(caller, &callee, call_type, self.clock.now())
                .inspect_err(|e| {
                    if matches!(e, QuadError::UserBusy { .. }) {
                        quad_prometheus::record_call("busy");
                    }
                })?;

            let incoming = ServerEvent::IncomingCall {
                from: caller.clone(),
                from_user: request.from_user.unwrap_or(Value::Null),
                signal_data,
                call_type,
            };
            if let Err(e) = callee_conn.emit(incoming) {
                table.close(&session.call_id);
                quad_prometheus::record_call("offline");
                warn!(call_id = %session.call_id, error = %e, "callee vanished while ringing");
                return Err(QuadError::UserOffline { user_id: callee });
            }
            self.emit_to(
                caller,
                ServerEvent::CallRinging {
                    to: callee.clone(),
                    call_id: session.call_id.clone(),
                },
            );
            session
        };

        info!(
            call_id = %session.call_id,
            caller_id = %caller,
            receiver_id = %callee,
            call_type = %call_type,
            "call ringing"
        );
        self.arm_ring_timeout(session.call_id.clone(), session.attempt);
        Ok(session)
    }

    /// Accepts the ringing call addressed to `callee`.
    ///
    /// Forwards the answer to the caller, then stamps one `connected_at` and
    /// sends that same instant to both parties in `call-connected`.
    pub fn answer(&self, callee: &UserId, request: AnswerCall) -> Result<CallSession, QuadError> {
        let signal = request.signal.ok_or_else(|| {
            QuadError::SignalingProtocol("answer-call requires signal".to_string())
        })?;

        let mut table = self.table();
        let session = table
            .session_for_mut(callee)
            .filter(|s| &s.receiver_id == callee)
            .ok_or_else(|| QuadError::NoActiveCall {
                user_id: callee.clone(),
            })?;
        if let Some(to) = &request.to {
            if to != &session.caller_id {
                return Err(QuadError::SignalingProtocol(format!(
                    "answer addressed to {to} but call is from {}",
                    session.caller_id
                )));
            }
        }
        if session.status != CallStatus::Ringing {
            return Err(QuadError::SignalingProtocol(
                "call already answered".to_string(),
            ));
        }

        session.status = CallStatus::Connecting;
        let caller = session.caller_id.clone();
        let call_id = session.call_id.clone();
        let Some(caller_conn) = self.registry.resolve(&caller) else {
            table.close(&call_id);
            drop(table);
            self.emit_to(
                callee,
                ServerEvent::CallEnded {
                    reason: Some(EndReason::Disconnect),
                },
            );
            return Err(QuadError::UserOffline { user_id: caller });
        };
        emit_logged(&caller_conn, &caller, ServerEvent::CallAccepted(signal));

        let at = self.clock.now();
        session.connected_at = Some(at);
        session.status = CallStatus::Connected;
        let connected = session.clone();

        emit_logged(
            &caller_conn,
            &caller,
            ServerEvent::CallConnected { start_time: at },
        );
        self.emit_to(callee, ServerEvent::CallConnected { start_time: at });
        drop(table);

        quad_prometheus::record_call("connected");
        info!(call_id = %call_id, connected_at = %at, "call connected");
        Ok(connected)
    }

    /// Forwards an ICE candidate. A missing target is a silent no-op.
    pub fn relay_ice(&self, from: &UserId, request: IceCandidate) -> Result<(), QuadError> {
        let to = request.to.ok_or_else(|| {
            QuadError::SignalingProtocol("ice-candidate requires to".to_string())
        })?;
        let candidate = request.candidate.ok_or_else(|| {
            QuadError::SignalingProtocol("ice-candidate requires candidate".to_string())
        })?;
        match self.registry.resolve(&to) {
            Some(conn) => {
                if conn.emit(ServerEvent::IceCandidate(candidate)).is_err() {
                    debug!(from = %from, to = %to, "ice target vanished, dropped");
                }
            }
            None => debug!(from = %from, to = %to, "ice target offline, dropped"),
        }
        Ok(())
    }

    /// Declines the call ringing for `callee` and tells the caller.
    ///
    /// Returns `None` when there was nothing to reject.
    pub fn reject(&self, callee: &UserId, _request: CallTarget) -> Option<CallSession> {
        let mut table = self.table();
        let is_receiver = table
            .session_for(callee)
            .is_some_and(|s| &s.receiver_id == callee);
        if !is_receiver {
            debug!(user_id = %callee, "reject with no incoming call");
            return None;
        }
        let session = table.close_for(callee)?;
        self.emit_to(&session.caller_id, ServerEvent::CallRejected {});
        drop(table);

        quad_prometheus::record_call("rejected");
        info!(call_id = %session.call_id, "call rejected");
        Some(session)
    }

    /// Hangs up whatever call `user` is in and tells the other party.
    pub fn end(&self, user: &UserId, _request: CallTarget) -> Option<CallSession> {
        self.terminate(user, EndReason::Hangup)
    }

    /// Ends `user`'s call after their connection dropped.
    pub fn handle_disconnect(&self, user: &UserId) -> Option<CallSession> {
        self.terminate(user, EndReason::Disconnect)
    }

    /// The session `user` is party to.
    pub fn active_session(&self, user: &UserId) -> Option<CallSession> {
        self.table().session_for(user).cloned()
    }

    /// Number of live sessions.
    pub fn active_count(&self) -> usize {
        self.table().len()
    }

    fn terminate(&self, user: &UserId, reason: EndReason) -> Option<CallSession> {
        let mut table = self.table();
        let session = table.close_for(user)?;
        if let Some(peer) = session.peer_of(user) {
            self.emit_to(
                peer,
                ServerEvent::CallEnded {
                    reason: Some(reason),
                },
            );
        }
        drop(table);

        quad_prometheus::record_call("ended");
        info!(call_id = %session.call_id, ended_by = %user, ?reason, "call ended");
        Some(session)
    }

    fn arm_ring_timeout(&self, call_id: CallId, attempt: u64) {
        let coordinator = self.clone();
        let window = self.ring_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            coordinator.expire(&call_id, attempt);
        });
    }

    /// Ends a call that is still ringing after the ring window, as if the
    /// caller hung up.
    fn expire(&self, call_id: &CallId, attempt: u64) {
        let mut table = self.table();
        let still_ringing = table
            .get(call_id)
            .is_some_and(|s| s.attempt == attempt && s.status == CallStatus::Ringing);
        if !still_ringing {
            return;
        }
        let Some(session) = table.close(call_id) else {
            return;
        };
        self.emit_to(
            &session.caller_id,
            ServerEvent::CallEnded {
                reason: Some(EndReason::Timeout),
            },
        );
        self.emit_to(
            &session.receiver_id,
            ServerEvent::CallEnded {
                reason: Some(EndReason::Hangup),
            },
        );
        drop(table);

        quad_prometheus::record_call("timeout");
        info!(call_id = %session.call_id, "call not answered in time");
    }

    fn emit_to(&self, user: &UserId, event: ServerEvent) {
        match self.registry.resolve(user) {
            Some(conn) => emit_logged(&conn, user, event),
            None => debug!(user_id = %user, event = event.name(), "recipient offline, dropped"),
        }
    }
}

fn emit_logged(conn: &ConnectionHandle, user: &UserId, event: ServerEvent) {
    let name = event.name();
    if let Err(e) = conn.emit(event) {
        warn!(user_id = %user, event = name, error = %e, "signaling emit failed (non-fatal)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quad_test_utils::{ManualClock, TestClient};
    use serde_json::json;

    const RING: Duration = Duration::from_secs(30);

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        calls: CallCoordinator,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let registry = Arc::new(ConnectionRegistry::new(clock.clone()));
        let calls = CallCoordinator::new(registry.clone(), clock, RING);
        Fixture { registry, calls }
    }

    impl Fixture {
        fn connect(&self, user: &str) -> TestClient {
            let client = TestClient::new(user);
            self.registry.register(user.into(), client.handle());
            client
        }

        fn call(&self, from: &str, to: &str) -> Result<CallSession, QuadError> {
            self.calls.initiate(
                &from.into(),
                CallUser {
                    user_to_call: Some(to.into()),
                    from: Some(from.into()),
                    from_user: Some(json!({"name": from})),
                    signal_data: Some(json!({"sdp": "offer"})),
                    call_type: Some(CallType::Video),
                },
            )
        }

        fn answer(&self, callee: &str) -> Result<CallSession, QuadError> {
            self.calls.answer(
                &callee.into(),
                AnswerCall {
                    to: None,
                    signal: Some(json!({"sdp": "answer"})),
                },
            )
        }
    }

    #[tokio::test]
    async fn initiate_rings_callee_and_confirms_to_caller() {
        let f = fixture();
        let mut alice = f.connect("alice");
        let mut bob = f.connect("bob");

        let session = f.call("alice", "bob").unwrap();
        assert_eq!(session.status, CallStatus::Ringing);

        assert_eq!(
            bob.drain(),
            vec![ServerEvent::IncomingCall {
                from: "alice".into(),
                from_user: json!({"name": "alice"}),
                signal_data: json!({"sdp": "offer"}),
                call_type: CallType::Video,
            }]
        );
        assert_eq!(
            alice.drain(),
            vec![ServerEvent::CallRinging {
                to: "bob".into(),
                call_id: session.call_id.clone(),
            }]
        );
        assert_eq!(f.calls.active_count(), 1);
    }

    #[tokio::test]
    async fn offline_callee_fails_fast() {
        let f = fixture();
        let _alice = f.connect("alice");
        let err = f.call("alice", "bob").unwrap_err();
        assert!(matches!(err, QuadError::UserOffline { user_id } if user_id.as_str() == "bob"));
        assert_eq!(f.calls.active_count(), 0);
    }

    #[tokio::test]
    async fn busy_callee_creates_no_session() {
        let f = fixture();
        let _a = f.connect("alice");
        let _b = f.connect("bob");
        let _c = f.connect("carol");
        f.call("bob", "carol").unwrap();

        let err = f.call("alice", "bob").unwrap_err();
        assert!(matches!(err, QuadError::UserBusy { .. }));
        assert!(f.calls.active_session(&"alice".into()).is_none());
        assert_eq!(
            f.calls.active_session(&"bob".into()).unwrap().receiver_id.as_str(),
            "carol"
        );
        assert_eq!(f.calls.active_count(), 1);
    }

    #[tokio::test]
    async fn caller_in_a_call_gets_already_in_call() {
        let f = fixture();
        let _a = f.connect("alice");
        let _b = f.connect("bob");
        let _c = f.connect("carol");
        f.call("alice", "bob").unwrap();
        let err = f.call("alice", "carol").unwrap_err();
        assert!(matches!(err, QuadError::AlreadyInCall { .. }));
    }

    #[tokio::test]
    async fn caller_in_a_call_dialing_offline_user_gets_already_in_call() {
        let f = fixture();
        let _a = f.connect("alice");
        let _b = f.connect("bob");
        f.call("alice", "bob").unwrap();

        let err = f.call("alice", "carol").unwrap_err();
        assert!(matches!(err, QuadError::AlreadyInCall { user_id } if user_id.as_str() == "alice"));
        assert_eq!(f.calls.active_count(), 1);
    }

    #[tokio::test]
    async fn missing_fields_are_protocol_errors_without_state() {
        let f = fixture();
        let _a = f.connect("alice");
        let _b = f.connect("bob");
        let err = f
            .calls
            .initiate(
                &"alice".into(),
                CallUser {
                    user_to_call: Some("bob".into()),
                    from: None,
                    from_user: None,
                    signal_data: None,
                    call_type: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, QuadError::SignalingProtocol(_)));
        assert_eq!(f.calls.active_count(), 0);

        let err = f
            .calls
            .answer(&"bob".into(), AnswerCall { to: None, signal: None })
            .unwrap_err();
        assert!(matches!(err, QuadError::SignalingProtocol(_)));
    }

    #[tokio::test]
    async fn answer_sends_identical_start_time_to_both() {
        let f = fixture();
        let mut alice = f.connect("alice");
        let mut bob = f.connect("bob");
        f.call("alice", "bob").unwrap();
        alice.drain();
        bob.drain();

        let session = f.answer("bob").unwrap();
        let at = session.connected_at.unwrap();
        assert_eq!(session.status, CallStatus::Connected);

        assert_eq!(
            alice.drain(),
            vec![
                ServerEvent::CallAccepted(json!({"sdp": "answer"})),
                ServerEvent::CallConnected { start_time: at },
            ]
        );
        let bob_events = bob.drain();
        assert_eq!(bob_events, vec![ServerEvent::CallConnected { start_time: at }]);
    }

    #[tokio::test]
    async fn only_the_callee_can_answer_once() {
        let f = fixture();
        let _a = f.connect("alice");
        let _b = f.connect("bob");
        f.call("alice", "bob").unwrap();

        assert!(matches!(
            f.answer("alice"),
            Err(QuadError::NoActiveCall { .. })
        ));
        f.answer("bob").unwrap();
        assert!(matches!(
            f.answer("bob"),
            Err(QuadError::SignalingProtocol(_))
        ));
    }

    #[tokio::test]
    async fn reject_notifies_caller_and_clears_both() {
        let f = fixture();
        let mut alice = f.connect("alice");
        let _b = f.connect("bob");
        f.call("alice", "bob").unwrap();
        alice.drain();

        assert!(f.calls.reject(&"alice".into(), CallTarget { to: None }).is_none());
        let rejected = f
            .calls
            .reject(&"bob".into(), CallTarget { to: Some("alice".into()) })
            .unwrap();
        assert_eq!(rejected.caller_id.as_str(), "alice");
        assert_eq!(alice.drain(), vec![ServerEvent::CallRejected {}]);
        assert_eq!(f.calls.active_count(), 0);
    }

    #[tokio::test]
    async fn end_from_either_side_notifies_the_other() {
        let f = fixture();
        let mut alice = f.connect("alice");
        let mut bob = f.connect("bob");
        f.call("alice", "bob").unwrap();
        f.answer("bob").unwrap();
        alice.drain();
        bob.drain();

        f.calls.end(&"bob".into(), CallTarget { to: None }).unwrap();
        assert_eq!(
            alice.drain(),
            vec![ServerEvent::CallEnded {
                reason: Some(EndReason::Hangup)
            }]
        );
        assert!(bob.drain().is_empty());
        assert!(f.calls.end(&"alice".into(), CallTarget { to: None }).is_none());
    }

    #[tokio::test]
    async fn disconnect_mid_call_ends_it_for_the_peer() {
        let f = fixture();
        let mut alice = f.connect("alice");
        let _b = f.connect("bob");
        f.call("alice", "bob").unwrap();
        f.answer("bob").unwrap();
        alice.drain();

        f.calls.handle_disconnect(&"bob".into()).unwrap();
        assert_eq!(
            alice.drain(),
            vec![ServerEvent::CallEnded {
                reason: Some(EndReason::Disconnect)
            }]
        );
        assert!(f.calls.active_session(&"alice".into()).is_none());
        assert!(f.calls.active_session(&"bob".into()).is_none());
    }

    #[tokio::test]
    async fn ice_is_relayed_or_dropped() {
        let f = fixture();
        let _a = f.connect("alice");
        let mut bob = f.connect("bob");
        f.calls
            .relay_ice(
                &"alice".into(),
                IceCandidate {
                    to: Some("bob".into()),
                    candidate: Some(json!({"c": 1})),
                },
            )
            .unwrap();
        assert_eq!(bob.drain(), vec![ServerEvent::IceCandidate(json!({"c": 1}))]);

        f.calls
            .relay_ice(
                &"alice".into(),
                IceCandidate {
                    to: Some("ghost".into()),
                    candidate: Some(json!({"c": 2})),
                },
            )
            .unwrap();
        assert_eq!(f.calls.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_call_times_out_for_both() {
        let f = fixture();
        let mut alice = f.connect("alice");
        let mut bob = f.connect("bob");
        f.call("alice", "bob").unwrap();
        alice.drain();
        bob.drain();

        tokio::time::sleep(RING + Duration::from_secs(1)).await;

        assert_eq!(
            alice.drain(),
            vec![ServerEvent::CallEnded {
                reason: Some(EndReason::Timeout)
            }]
        );
        assert_eq!(
            bob.drain(),
            vec![ServerEvent::CallEnded {
                reason: Some(EndReason::Hangup)
            }]
        );
        assert_eq!(f.calls.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn answered_call_survives_ring_window() {
        let f = fixture();
        let mut alice = f.connect("alice");
        let _b = f.connect("bob");
        f.call("alice", "bob").unwrap();
        f.answer("bob").unwrap();
        alice.drain();

        tokio::time::sleep(RING * 2).await;
        assert!(alice.drain().is_empty());
        assert_eq!(f.calls.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_does_not_end_a_later_call() {
        let f = fixture();
        let mut alice = f.connect("alice");
        let _b = f.connect("bob");
        f.call("alice", "bob").unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        f.calls.end(&"alice".into(), CallTarget { to: None });
        f.call("alice", "bob").unwrap();
        alice.drain();

        // First call's timer fires at 30s; the second call rings until 50s.
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(alice.drain().is_empty());
        assert_eq!(f.calls.active_count(), 1);
    }
}
