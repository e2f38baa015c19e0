// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Issue persistence collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::QuadError;
use crate::types::{EscalationLevel, Issue, IssueId, IssueStatus, UserId};

/// Persistent store for reported issues.
#[async_trait]
pub trait IssueStore: Send + Sync + 'static {
    /// Persists a new issue.
    async fn insert_issue(&self, issue: &Issue) -> Result<(), QuadError>;

    /// Fetches an issue by id, including its escalation history.
    async fn find_issue(&self, id: &IssueId) -> Result<Option<Issue>, QuadError>;

    /// Non-terminal issues currently at `level`.
    async fn issues_at_level(&self, level: EscalationLevel) -> Result<Vec<Issue>, QuadError>;

    /// Advances an issue from `from` to `to`, reassigning it to `user_id`.
    ///
    /// Restamps `escalated_at` to `at` and appends exactly one history entry.
    /// Fails with [`QuadError::InvalidTransition`] if the issue is no longer
    /// at `from` or `to` does not lie above it.
    async fn advance_issue_escalation(
        &self,
        issue_id: &IssueId,
        from: EscalationLevel,
        to: EscalationLevel,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Issue, QuadError>;

    /// Updates an issue's lifecycle status.
    async fn update_issue_status(
        &self,
        issue_id: &IssueId,
        status: IssueStatus,
    ) -> Result<(), QuadError>;
}
