// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch of client intents into the real-time modules.
//!
//! Errors raised while handling a client event never escape: each becomes
//! an event sent back to the connection that caused it.

use std::sync::Arc;

use quad_calls::CallCoordinator;
use quad_core::{ClientEvent, ConnectionHandle, QuadError, ServerEvent, UserId};
use quad_messaging::DeliveryPipeline;
use quad_presence::{ConnectionRegistry, PresenceBroadcaster};
use tracing::{debug, warn};

/// Page size for `message:history` when the client gives none.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Per-connection state: the transport handle and the joined identity.
#[derive(Debug)]
pub struct ClientSession {
    connection: ConnectionHandle,
    user: Option<UserId>,
}

impl ClientSession {
    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    /// The user this connection joined as, if it has.
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }
}

/// Routes client events to presence, messaging, and call signaling.
pub struct Hub {
    presence: PresenceBroadcaster,
    pipeline: Arc<DeliveryPipeline>,
    calls: CallCoordinator,
}

impl Hub {
    pub fn new(
        presence: PresenceBroadcaster,
        pipeline: Arc<DeliveryPipeline>,
        calls: CallCoordinator,
    ) -> Self {
        Self {
            presence,
            pipeline,
            calls,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.presence.registry()
    }

    pub fn pipeline(&self) -> &Arc<DeliveryPipeline> {
        &self.pipeline
    }

    pub fn calls(&self) -> &CallCoordinator {
        &self.calls
    }

    /// Starts tracking a new, not yet joined, connection.
    pub fn open(&self, connection: ConnectionHandle) -> ClientSession {
        debug!(connection_id = %connection.id(), "connection opened");
        ClientSession {
            connection,
            user: None,
        }
    }

    /// Decodes one text frame and handles it.
    pub async fn handle_frame(&self, session: &mut ClientSession, frame: &str) {
        match serde_json::from_str::<ClientEvent>(frame) {
            Ok(event) => self.handle(session, event).await,
            Err(e) => {
                debug!(connection_id = %session.connection.id(), error = %e, "undecodable frame");
                reply(
                    session,
                    ServerEvent::Error {
                        message: format!("invalid event: {e}"),
                    },
                );
            }
        }
    }

    /// Handles one decoded client event.
    pub async fn handle(&self, session: &mut ClientSession, event: ClientEvent) {
        let name = event.name();
        if let Err(e) = self.dispatch(session, event).await {
            debug!(event = name, error = %e, "client event failed");
            reply(session, e.to_event());
        }
    }

    async fn dispatch(
        &self,
        session: &mut ClientSession,
        event: ClientEvent,
    ) -> Result<(), QuadError> {
        if let ClientEvent::Join(user_id) = event {
            return self.join(session, user_id);
        }
        let Some(user) = session.user.clone() else {
            return Err(QuadError::Forbidden(format!(
                "join required before {}",
                event.name()
            )));
        };
        if !self.is_live(session) {
            return Err(QuadError::Forbidden(format!(
                "session for {user} was replaced by another connection"
            )));
        }

        match event {
            ClientEvent::Join(_) => Ok(()),
            ClientEvent::MessageSend(req) => {
                match self
                    .pipeline
                    .send(user, req.receiver_id, req.text, req.media)
                    .await
                {
                    // The sender already saw `failed` for this message.
                    Err(QuadError::PersistenceFailure { .. }) => Ok(()),
                    other => other.map(|_| ()),
                }
            }
            ClientEvent::MessageRead(req) => {
                self.pipeline.mark_read(&req.message_id, &user).await?;
                Ok(())
            }
            ClientEvent::MessageHistory(req) => {
                let limit = req.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
                let messages = self
                    .pipeline
                    .history(&user, &req.peer_id, Some(limit))
                    .await?;
                reply(
                    session,
                    ServerEvent::MessageHistory {
                        peer_id: req.peer_id,
                        messages,
                    },
                );
                Ok(())
            }
            ClientEvent::CallUser(req) => self.calls.initiate(&user, req).map(|_| ()),
            ClientEvent::AnswerCall(req) => self.calls.answer(&user, req).map(|_| ()),
            ClientEvent::RejectCall(req) => {
                self.calls.reject(&user, req);
                Ok(())
            }
            ClientEvent::EndCall(req) => {
                self.calls.end(&user, req);
                Ok(())
            }
            ClientEvent::IceCandidate(req) => self.calls.relay_ice(&user, req),
        }
    }

    fn join(&self, session: &mut ClientSession, user_id: UserId) -> Result<(), QuadError> {
        if let Some(current) = &session.user {
            if current != &user_id {
                return Err(QuadError::Forbidden(format!(
                    "connection already joined as {current}"
                )));
            }
            if !self.is_live(session) {
                return Err(QuadError::Forbidden(format!(
                    "session for {current} was replaced by another connection"
                )));
            }
        }
        if user_id.as_str().trim().is_empty() {
            return Err(QuadError::Forbidden("user id must not be empty".to_string()));
        }

        self.presence
            .connect(user_id.clone(), session.connection.clone());
        session.user = Some(user_id.clone());
        reply(
            session,
            ServerEvent::JoinSuccess {
                user_id,
                connection_id: session.connection.id().clone(),
                online_count: self.registry().count(),
            },
        );
        Ok(())
    }

    /// Whether `session` is still the registered connection of its user.
    fn is_live(&self, session: &ClientSession) -> bool {
        session.user.as_ref().is_some_and(|user| {
            self.registry()
                .resolve(user)
                .is_some_and(|conn| conn.same_connection(&session.connection))
        })
    }

    /// Tears down a connection that has gone away.
    ///
    /// If it was still the user's live connection, the user goes offline
    /// and any call they were in ends for the other party.
    pub fn close(&self, session: ClientSession) {
        let Some(user) = session.user else {
            debug!(connection_id = %session.connection.id(), "unjoined connection closed");
            return;
        };
        if self.presence.disconnect(&session.connection).is_some() {
            self.calls.handle_disconnect(&user);
        }
    }
}

fn reply(session: &ClientSession, event: ServerEvent) {
    if let Err(e) = session.connection.emit(event) {
        warn!(connection_id = %session.connection.id(), error = %e, "reply dropped");
    }
}
