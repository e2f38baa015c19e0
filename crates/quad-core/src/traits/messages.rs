// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence collaborator.

use async_trait::async_trait;

use crate::error::QuadError;
use crate::types::{IssueId, Message, MessageId, MessageStatus, UserId};

/// Persistent store for messages.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persists a new message.
    async fn save_message(&self, msg: &Message) -> Result<(), QuadError>;

    /// Fetches a message by id.
    async fn find_message(&self, id: &MessageId) -> Result<Option<Message>, QuadError>;

    /// Moves a stored message's status forward.
    ///
    /// Implementations reject regressions with [`QuadError::InvalidTransition`].
    async fn update_message_status(
        &self,
        id: &MessageId,
        status: MessageStatus,
    ) -> Result<(), QuadError>;

    /// Messages exchanged between two users, oldest first.
    async fn conversation(
        &self,
        a: &UserId,
        b: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, QuadError>;

    /// The message tagged `is_original_issue_message` for an issue.
    async fn find_original_issue_message(
        &self,
        issue_id: &IssueId,
    ) -> Result<Option<Message>, QuadError>;
}
