// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory collaborator store with failure injection.
//!
//! `MemoryStore` implements `MessageStore`, `IssueStore`, and `Directory`
//! with the same observable rules as the SQLite store (forward-only message
//! status, optimistic escalation advance), plus switches that make selected
//! operations fail with `PersistenceFailure`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use quad_core::{
    Directory, EscalationEntry, EscalationLevel, Issue, IssueId, IssueStatus, IssueStore,
    Message, MessageId, MessageStatus, MessageStore, QuadError, Role, UserId,
};

#[derive(Default)]
struct Inner {
    messages: Vec<Message>,
    issues: HashMap<IssueId, Issue>,
    users: Vec<(UserId, Role, Option<String>)>,
    fail_saves: bool,
    fail_saves_to: HashSet<UserId>,
    fail_status_updates: bool,
    fail_updates_to: HashSet<MessageStatus>,
    fail_advance_for: HashSet<IssueId>,
    fail_directory: bool,
    directory_lookups: usize,
}

fn injected(what: &str) -> QuadError {
    QuadError::persistence(format!("injected failure: {what}"))
}

/// A collaborator store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store with no failures armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory entry.
    pub async fn add_user(&self, id: &str, role: Role, department: Option<&str>) {
        self.inner
            .lock()
            .await
            .users
            .push((id.into(), role, department.map(str::to_string)));
    }

    /// All stored messages in insertion order.
    pub async fn messages(&self) -> Vec<Message> {
        self.inner.lock().await.messages.clone()
    }

    /// A stored message by id.
    pub async fn message(&self, id: &MessageId) -> Option<Message> {
        self.inner
            .lock()
            .await
            .messages
            .iter()
            .find(|m| &m.id == id)
            .cloned()
    }

    /// Stored messages addressed to `user`.
    pub async fn messages_to(&self, user: &str) -> Vec<Message> {
        self.inner
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.receiver_id.as_str() == user)
            .cloned()
            .collect()
    }

    /// A stored issue by id.
    pub async fn issue(&self, id: &str) -> Option<Issue> {
        self.inner.lock().await.issues.get(&IssueId::from(id)).cloned()
    }

    /// Number of directory lookups served so far.
    pub async fn directory_lookups(&self) -> usize {
        self.inner.lock().await.directory_lookups
    }

    /// Make every `save_message` fail.
    pub async fn set_fail_saves(&self, fail: bool) {
        self.inner.lock().await.fail_saves = fail;
    }

    /// Make `save_message` fail for messages addressed to `user`.
    pub async fn fail_saves_to(&self, user: &str) {
        self.inner.lock().await.fail_saves_to.insert(user.into());
    }

    /// Make every `update_message_status` fail.
    pub async fn set_fail_status_updates(&self, fail: bool) {
        self.inner.lock().await.fail_status_updates = fail;
    }

    /// Make `update_message_status` fail only when moving to `status`.
    pub async fn fail_status_updates_to(&self, status: MessageStatus) {
        self.inner.lock().await.fail_updates_to.insert(status);
    }

    /// Make `advance_issue_escalation` fail for one issue.
    pub async fn fail_advance_for(&self, issue_id: &str) {
        self.inner
            .lock()
            .await
            .fail_advance_for
            .insert(issue_id.into());
    }

    /// Make directory lookups fail.
    pub async fn set_fail_directory(&self, fail: bool) {
        self.inner.lock().await.fail_directory = fail;
    }

    /// Clear every armed failure.
    pub async fn heal(&self) {
        let mut inner = self.inner.lock().await;
        inner.fail_saves = false;
        inner.fail_saves_to.clear();
        inner.fail_status_updates = false;
        inner.fail_updates_to.clear();
        inner.fail_advance_for.clear();
        inner.fail_directory = false;
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn save_message(&self, msg: &Message) -> Result<(), QuadError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_saves || inner.fail_saves_to.contains(&msg.receiver_id) {
            return Err(injected("save_message"));
        }
        inner.messages.push(msg.clone());
        Ok(())
    }

    async fn find_message(&self, id: &MessageId) -> Result<Option<Message>, QuadError> {
        Ok(self.message(id).await)
    }

    async fn update_message_status(
        &self,
        id: &MessageId,
        status: MessageStatus,
    ) -> Result<(), QuadError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_status_updates || inner.fail_updates_to.contains(&status) {
            return Err(injected("update_message_status"));
        }
        let msg = inner
            .messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| QuadError::NotFound {
                kind: "message",
                id: id.to_string(),
            })?;
        msg.advance(status)
    }

    async fn conversation(
        &self,
        a: &UserId,
        b: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, QuadError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| {
                (&m.sender_id == a && &m.receiver_id == b)
                    || (&m.sender_id == b && &m.receiver_id == a)
            })
            .cloned()
            .collect();
        out.sort_by_key(|m| m.created_at);
        if let Some(limit) = limit {
            let skip = out.len().saturating_sub(limit as usize);
            out.drain(..skip);
        }
        Ok(out)
    }

    async fn find_original_issue_message(
        &self,
        issue_id: &IssueId,
    ) -> Result<Option<Message>, QuadError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .messages
            .iter()
            .find(|m| m.is_original_issue_message && m.issue_id.as_ref() == Some(issue_id))
            .cloned())
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn insert_issue(&self, issue: &Issue) -> Result<(), QuadError> {
        self.inner
            .lock()
            .await
            .issues
            .insert(issue.id.clone(), issue.clone());
        Ok(())
    }

    async fn find_issue(&self, id: &IssueId) -> Result<Option<Issue>, QuadError> {
        Ok(self.inner.lock().await.issues.get(id).cloned())
    }

    async fn issues_at_level(&self, level: EscalationLevel) -> Result<Vec<Issue>, QuadError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<Issue> = inner
            .issues
            .values()
            .filter(|i| i.escalation_level == Some(level) && !i.status.is_terminal())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.escalated_at.cmp(&b.escalated_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn advance_issue_escalation(
        &self,
        issue_id: &IssueId,
        from: EscalationLevel,
        to: EscalationLevel,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Issue, QuadError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_advance_for.contains(issue_id) {
            return Err(injected("advance_issue_escalation"));
        }
        let issue = inner
            .issues
            .get_mut(issue_id)
            .ok_or_else(|| QuadError::NotFound {
                kind: "issue",
                id: issue_id.to_string(),
            })?;
        if issue.escalation_level != Some(from) || to <= from {
            return Err(QuadError::InvalidTransition {
                from: issue
                    .escalation_level
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                to: to.to_string(),
            });
        }
        issue.escalation_level = Some(to);
        issue.assignee_id = user_id.clone();
        issue.escalated_at = at;
        issue.escalation_history.push(EscalationEntry {
            level: to,
            user_id: user_id.clone(),
            escalated_at: at,
        });
        Ok(issue.clone())
    }

    async fn update_issue_status(
        &self,
        issue_id: &IssueId,
        status: IssueStatus,
    ) -> Result<(), QuadError> {
        let mut inner = self.inner.lock().await;
        let issue = inner
            .issues
            .get_mut(issue_id)
            .ok_or_else(|| QuadError::NotFound {
                kind: "issue",
                id: issue_id.to_string(),
            })?;
        issue.status = status;
        Ok(())
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn find_user_by_role(
        &self,
        role: Role,
        department: Option<&str>,
    ) -> Result<Option<UserId>, QuadError> {
        let mut inner = self.inner.lock().await;
        inner.directory_lookups += 1;
        if inner.fail_directory {
            return Err(injected("find_user_by_role"));
        }
        Ok(inner
            .users
            .iter()
            .find(|(_, r, d)| *r == role && (department.is_none() || d.as_deref() == department))
            .map(|(id, _, _)| id.clone()))
    }
}
