// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send, read, forward, and history operations over the message store.

use std::sync::Arc;

use quad_core::{
    Clock, Message, MessageId, MessageStatus, MessageStore, QuadError, ServerEvent, UserId,
};
use quad_presence::ConnectionRegistry;
use tracing::{debug, error, info, warn};

/// Routes messages between users and drives their status transitions.
///
/// Only this type mutates message status. Callers get back the message as it
/// stood when the operation finished.
pub struct DeliveryPipeline {
    store: Arc<dyn MessageStore>,
    registry: Arc<ConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl DeliveryPipeline {
    pub fn new(
        store: Arc<dyn MessageStore>,
        registry: Arc<ConnectionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
        }
    }

    /// Sends a new message from `sender` to `receiver`.
    ///
    /// A persistence failure is reported to the sender as `failed` and then
    /// returned as [`QuadError::PersistenceFailure`]. A retry is a new send.
    pub async fn send(
        &self,
        sender: UserId,
        receiver: UserId,
        text: String,
        media: Vec<String>,
    ) -> Result<Message, QuadError> {
        let msg = Message::new(sender, receiver, text, media, self.clock.now());
        debug!(
            message_id = %msg.id,
            sender_id = %msg.sender_id,
            receiver_id = %msg.receiver_id,
            "message send"
        );
        self.deliver(msg).await
    }

    /// Marks a message read on behalf of `reader`.
    ///
    /// Only the receiver may do this. Reading an already-read message is a
    /// no-op and emits nothing.
    pub async fn mark_read(
        &self,
        message_id: &MessageId,
        reader: &UserId,
    ) -> Result<Message, QuadError> {
        let mut msg =
            self.store
                .find_message(message_id)
                .await?
                .ok_or_else(|| QuadError::NotFound {
                    kind: "message",
                    id: message_id.to_string(),
                })?;

        if &msg.receiver_id != reader {
            warn!(message_id = %msg.id, reader = %reader, "read attempted by non-receiver");
            return Err(QuadError::Forbidden(format!(
                "user {reader} is not the receiver of message {message_id}"
            )));
        }
        if msg.status == MessageStatus::Read {
            return Ok(msg);
        }

        msg.advance(MessageStatus::Read)?;
        self.store
            .update_message_status(&msg.id, MessageStatus::Read)
            .await?;
        quad_prometheus::record_message_status(MessageStatus::Read);
        self.notify_sender(&msg);
        Ok(msg)
    }

    /// Forwards a stored message to `to` as a new auto-forwarded message.
    ///
    /// The copy keeps the original sender and issue, increments
    /// `forward_count`, and references the root of the forwarding chain. It
    /// goes through the same delivery path as a fresh send.
    pub async fn forward(
        &self,
        original_id: &MessageId,
        to: &UserId,
    ) -> Result<Message, QuadError> {
        let original =
            self.store
                .find_message(original_id)
                .await?
                .ok_or_else(|| QuadError::NotFound {
                    kind: "message",
                    id: original_id.to_string(),
                })?;
        let copy = Message::forwarded_from(&original, to.clone(), self.clock.now());
        info!(
            message_id = %copy.id,
            original_message_id = %original.id,
            to = %to,
            forward_count = copy.forward_count,
            "forwarding message"
        );
        self.deliver(copy).await
    }

    /// Conversation between `reader` and `peer`, oldest first.
    ///
    /// Fetching history never marks anything delivered.
    pub async fn history(
        &self,
        reader: &UserId,
        peer: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, QuadError> {
        self.store.conversation(reader, peer, limit).await
    }

    async fn deliver(&self, mut msg: Message) -> Result<Message, QuadError> {
        if let Err(e) = self.store.save_message(&msg).await {
            return Err(self.fail(msg, e).await);
        }
        if let Err(e) = self
            .store
            .update_message_status(&msg.id, MessageStatus::Sent)
            .await
        {
            return Err(self.fail(msg, e).await);
        }
        msg.advance(MessageStatus::Sent)?;
        quad_prometheus::record_message_status(MessageStatus::Sent);
        self.notify_sender(&msg);

        let Some(receiver) = self.registry.resolve(&msg.receiver_id) else {
            debug!(message_id = %msg.id, receiver_id = %msg.receiver_id, "receiver offline");
            return Ok(msg);
        };
        if let Err(e) = receiver.emit(ServerEvent::MessageNew(msg.clone())) {
            warn!(
                message_id = %msg.id,
                receiver_id = %msg.receiver_id,
                error = %e,
                "live delivery failed (non-fatal)"
            );
            return Ok(msg);
        }

        match self
            .store
            .update_message_status(&msg.id, MessageStatus::Delivered)
            .await
        {
            Ok(()) => {
                msg.advance(MessageStatus::Delivered)?;
                quad_prometheus::record_message_status(MessageStatus::Delivered);
                self.notify_sender(&msg);
            }
            Err(e) => {
                warn!(
                    message_id = %msg.id,
                    error = %e,
                    "could not record delivery, message stays sent"
                );
            }
        }
        Ok(msg)
    }

    /// Marks `msg` failed, tells its sender, and hands back the cause.
    async fn fail(&self, mut msg: Message, cause: QuadError) -> QuadError {
        error!(message_id = %msg.id, sender_id = %msg.sender_id, error = %cause, "message failed");
        msg.status = MessageStatus::Failed;
        if let Err(e) = self
            .store
            .update_message_status(&msg.id, MessageStatus::Failed)
            .await
        {
            debug!(message_id = %msg.id, error = %e, "failed status not recorded");
        }
        quad_prometheus::record_message_status(MessageStatus::Failed);
        self.notify_sender(&msg);
        cause
    }

    fn notify_sender(&self, msg: &Message) {
        let Some(sender) = self.registry.resolve(&msg.sender_id) else {
            return;
        };
        let event = ServerEvent::MessageStatus {
            message_id: msg.id.clone(),
            status: msg.status,
        };
        if let Err(e) = sender.emit(event) {
            warn!(message_id = %msg.id, error = %e, "status emit failed (non-fatal)");
        }
    }
}
