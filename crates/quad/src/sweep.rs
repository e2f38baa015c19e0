// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `quad sweep` command implementation.
//!
//! Runs one escalation sweep against the configured database. No clients
//! are connected, so forwarded reports are stored as `sent` and reach their
//! recipients through history.

use std::sync::Arc;

use quad_config::QuadConfig;
use quad_core::{Clock, QuadError, SystemClock};
use quad_escalation::{EscalationPolicy, EscalationScheduler, SweepReport};
use quad_messaging::DeliveryPipeline;
use quad_presence::ConnectionRegistry;
use quad_storage::SqliteStore;
use tracing::warn;

/// Runs the `quad sweep` command.
pub async fn run_sweep(config: QuadConfig) -> Result<SweepReport, QuadError> {
    crate::init_tracing(&config.server.log_level);
    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    let report = sweep_once(store.clone(), &config).await;
    if let Err(e) = store.close().await {
        warn!(error = %e, "database checkpoint after sweep failed");
    }
    Ok(report)
}

/// Builds an offline scheduler over `store` and sweeps once.
pub async fn sweep_once(store: Arc<SqliteStore>, config: &QuadConfig) -> SweepReport {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(ConnectionRegistry::new(clock.clone()));
    let pipeline = Arc::new(DeliveryPipeline::new(store.clone(), registry, clock.clone()));
    let scheduler = EscalationScheduler::start(
        store.clone(),
        store.clone(),
        store,
        pipeline,
        clock,
        EscalationPolicy::from_config(&config.escalation),
    )
    .await;
    scheduler.sweep().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use quad_core::{
        EscalationLevel, Issue, IssueId, IssueStatus, IssueStore, Message, MessageStore, Role,
        UserId,
    };

    #[tokio::test]
    async fn overdue_issue_is_escalated_to_director() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.db");
        let config = quad_config::load_and_validate_str(&format!(
            "[storage]\ndatabase_path = \"{}\"\n",
            path.display()
        ))
        .unwrap();
        let store = Arc::new(SqliteStore::open(&config.storage).await.unwrap());
        store
            .upsert_user(&UserId::from("dora"), "Dora", Role::Director, None)
            .await
            .unwrap();

        let reported_at = Utc::now() - Duration::days(2);
        let issue = Issue {
            id: IssueId::from("iss-1"),
            reporter_id: "rita".into(),
            assignee_id: "alex".into(),
            status: IssueStatus::Open,
            escalation_level: Some(EscalationLevel::Assigned),
            escalated_at: reported_at,
            escalation_history: Vec::new(),
        };
        store.insert_issue(&issue).await.unwrap();
        let mut report = Message::new(
            "rita".into(),
            "alex".into(),
            "the lift is broken",
            vec![],
            reported_at,
        );
        report.issue_id = Some(issue.id.clone());
        report.is_original_issue_message = true;
        store.save_message(&report).await.unwrap();

        let first = sweep_once(store.clone(), &config).await;
        assert_eq!(first.escalated, 1);

        let stored = store.find_issue(&issue.id).await.unwrap().unwrap();
        assert_eq!(stored.escalation_level, Some(EscalationLevel::Director));
        assert_eq!(stored.assignee_id.as_str(), "dora");

        let forwarded = store
            .conversation(&"dora".into(), &"rita".into(), None)
            .await
            .unwrap();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].text, "the lift is broken");
    }
}
