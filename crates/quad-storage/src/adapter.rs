// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementation of the collaborator traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quad_config::model::StorageConfig;
use quad_core::{
    Directory, EscalationLevel, Issue, IssueId, IssueStatus, IssueStore, Message, MessageId,
    MessageStatus, MessageStore, QuadError, Role, UserId,
};
use tracing::info;

use crate::database::Database;
use crate::queries;

/// Message, issue, and directory storage over one SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Opens the database named by the storage configuration.
    pub async fn open(config: &StorageConfig) -> Result<Self, QuadError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        info!(path = %config.database_path, "storage ready");
        Ok(Self { db })
    }

    /// Wraps an already-open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Adds or updates a directory entry.
    pub async fn upsert_user(
        &self,
        id: &UserId,
        name: &str,
        role: Role,
        department: Option<&str>,
    ) -> Result<(), QuadError> {
        queries::users::upsert_user(&self.db, id, name, role, department).await
    }

    /// Flushes the WAL before shutdown.
    pub async fn close(&self) -> Result<(), QuadError> {
        self.db.close().await
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn save_message(&self, msg: &Message) -> Result<(), QuadError> {
        queries::messages::insert_message(&self.db, msg).await
    }

    async fn find_message(&self, id: &MessageId) -> Result<Option<Message>, QuadError> {
        queries::messages::get_message(&self.db, id).await
    }

    async fn update_message_status(
        &self,
        id: &MessageId,
        status: MessageStatus,
    ) -> Result<(), QuadError> {
        queries::messages::update_status(&self.db, id, status).await
    }

    async fn conversation(
        &self,
        a: &UserId,
        b: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, QuadError> {
        queries::messages::conversation(&self.db, a, b, limit).await
    }

    async fn find_original_issue_message(
        &self,
        issue_id: &IssueId,
    ) -> Result<Option<Message>, QuadError> {
        queries::messages::original_issue_message(&self.db, issue_id).await
    }
}

#[async_trait]
impl IssueStore for SqliteStore {
    async fn insert_issue(&self, issue: &Issue) -> Result<(), QuadError> {
        queries::issues::insert_issue(&self.db, issue).await
    }

    async fn find_issue(&self, id: &IssueId) -> Result<Option<Issue>, QuadError> {
        queries::issues::get_issue(&self.db, id).await
    }

    async fn issues_at_level(&self, level: EscalationLevel) -> Result<Vec<Issue>, QuadError> {
        queries::issues::issues_at_level(&self.db, level).await
    }

    async fn advance_issue_escalation(
        &self,
        issue_id: &IssueId,
        from: EscalationLevel,
        to: EscalationLevel,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Issue, QuadError> {
        queries::issues::advance_escalation(&self.db, issue_id, from, to, user_id, at).await
    }

    async fn update_issue_status(
        &self,
        issue_id: &IssueId,
        status: IssueStatus,
    ) -> Result<(), QuadError> {
        queries::issues::update_status(&self.db, issue_id, status).await
    }
}

#[async_trait]
impl Directory for SqliteStore {
    async fn find_user_by_role(
        &self,
        role: Role,
        department: Option<&str>,
    ) -> Result<Option<UserId>, QuadError> {
        queries::users::find_by_role(&self.db, role, department).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_from_config_and_use_through_traits() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("quad.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let store = SqliteStore::open(&config).await.unwrap();
        store
            .upsert_user(&"own".into(), "Olga", Role::Owner, None)
            .await
            .unwrap();

        let messages: Arc<dyn MessageStore> = Arc::new(store.clone());
        let directory: Arc<dyn Directory> = Arc::new(store.clone());

        let msg = Message::new("a".into(), "b".into(), "hey", vec![], Utc::now());
        messages.save_message(&msg).await.unwrap();
        messages
            .update_message_status(&msg.id, MessageStatus::Sent)
            .await
            .unwrap();
        let loaded = messages.find_message(&msg.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MessageStatus::Sent);

        let owner = directory.find_user_by_role(Role::Owner, None).await.unwrap();
        assert_eq!(owner.map(|u| u.to_string()).as_deref(), Some("own"));

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("quad.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let msg = Message::new("a".into(), "b".into(), "persisted", vec![], Utc::now());
        {
            let store = SqliteStore::open(&config).await.unwrap();
            store.save_message(&msg).await.unwrap();
            store.close().await.unwrap();
        }
        let store = SqliteStore::open(&config).await.unwrap();
        let loaded = store.find_message(&msg.id).await.unwrap().unwrap();
        assert_eq!(loaded.text, "persisted");
    }
}
