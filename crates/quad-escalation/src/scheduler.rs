// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threshold-driven escalation sweep and manual escalation.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use quad_config::model::EscalationConfig;
use quad_core::{
    Clock, Directory, EscalationLevel, Issue, IssueId, IssueStore, MessageStore, QuadError, Role,
    UserId,
};
use quad_messaging::DeliveryPipeline;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Tier transitions a sweep walks, in order.
const TIERS: [(EscalationLevel, EscalationLevel); 2] = [
    (EscalationLevel::Assigned, EscalationLevel::Director),
    (EscalationLevel::Director, EscalationLevel::Owner),
];

/// How long an issue may sit at a level before it moves up.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    pub director_after: Duration,
    pub owner_after: Duration,
    pub department: Option<String>,
}

impl EscalationPolicy {
    pub fn from_config(config: &EscalationConfig) -> Self {
        Self {
            director_after: Duration::seconds(config.director_after_secs as i64),
            owner_after: Duration::seconds(config.owner_after_secs as i64),
            department: config.department.clone(),
        }
    }

    /// Threshold for leaving `from`.
    fn threshold(&self, from: EscalationLevel) -> Duration {
        match from {
            EscalationLevel::Assigned => self.director_after,
            EscalationLevel::Director | EscalationLevel::Owner => self.owner_after,
        }
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from_config(&EscalationConfig::default())
    }
}

/// Director and Owner resolved from the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EscalationTargets {
    pub director: Option<UserId>,
    pub owner: Option<UserId>,
}

impl EscalationTargets {
    fn for_level(&self, level: EscalationLevel) -> Option<&UserId> {
        match level {
            EscalationLevel::Assigned => None,
            EscalationLevel::Director => self.director.as_ref(),
            EscalationLevel::Owner => self.owner.as_ref(),
        }
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Issues forwarded and advanced.
    pub escalated: usize,
    /// Due issues left alone (no target, no original message, already moved).
    pub skipped: usize,
    /// Due issues whose forwarding or advance failed; retried next sweep.
    pub failed: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "escalated {}, skipped {}, failed {}",
            self.escalated, self.skipped, self.failed
        )
    }
}

enum Outcome {
    Escalated(Issue),
    Skipped,
}

/// Promotes overdue issues and forwards their original report upward.
pub struct EscalationScheduler {
    issues: Arc<dyn IssueStore>,
    messages: Arc<dyn MessageStore>,
    pipeline: Arc<DeliveryPipeline>,
    clock: Arc<dyn Clock>,
    policy: EscalationPolicy,
    targets: EscalationTargets,
}

impl EscalationScheduler {
    /// Resolves the Director and Owner once and builds the scheduler.
    ///
    /// A missing or unresolvable role disables that tier; it never fails
    /// startup.
    pub async fn start(
        issues: Arc<dyn IssueStore>,
        messages: Arc<dyn MessageStore>,
        directory: Arc<dyn Directory>,
        pipeline: Arc<DeliveryPipeline>,
        clock: Arc<dyn Clock>,
        policy: EscalationPolicy,
    ) -> Self {
        let department = policy.department.as_deref();
        let targets = EscalationTargets {
            director: resolve_role(directory.as_ref(), Role::Director, department).await,
            owner: resolve_role(directory.as_ref(), Role::Owner, department).await,
        };
        info!(
            director = ?targets.director,
            owner = ?targets.owner,
            "escalation targets resolved"
        );
        Self {
            issues,
            messages,
            pipeline,
            clock,
            policy,
            targets,
        }
    }

    pub fn targets(&self) -> &EscalationTargets {
        &self.targets
    }

    /// Runs both tiers once. One issue's failure never stops the sweep.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for (from, to) in TIERS {
            self.sweep_tier(from, to, &mut report).await;
        }
        if report.escalated + report.failed > 0 {
            info!(%report, "escalation sweep complete");
        } else {
            debug!(%report, "escalation sweep complete");
        }
        report
    }

    async fn sweep_tier(
        &self,
        from: EscalationLevel,
        to: EscalationLevel,
        report: &mut SweepReport,
    ) {
        let candidates = match self.issues.issues_at_level(from).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(level = %from, error = %e, "could not list issues (non-fatal)");
                report.failed += 1;
                return;
            }
        };
        let now = self.clock.now();
        let threshold = self.policy.threshold(from);
        let due: Vec<Issue> = candidates
            .into_iter()
            .filter(|issue| now - issue.escalated_at >= threshold)
            .collect();
        if due.is_empty() {
            return;
        }

        let Some(target) = self.targets.for_level(to) else {
            let skip = QuadError::SchedulerSkip(format!("no {to} configured"));
            warn!(level = %to, due = due.len(), error = %skip, "tier skipped");
            report.skipped += due.len();
            return;
        };

        for issue in due {
            match self.escalate(&issue.id, from, to, target, now).await {
                Ok(Outcome::Escalated(_)) => report.escalated += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(issue_id = %issue.id, error = %e, "escalation failed, will retry");
                    report.failed += 1;
                }
            }
        }
    }

    /// Moves one issue up a single rung now, regardless of thresholds.
    pub async fn manual_escalate(&self, issue_id: &IssueId) -> Result<Issue, QuadError> {
        let issue = self
            .issues
            .find_issue(issue_id)
            .await?
            .ok_or_else(|| QuadError::NotFound {
                kind: "issue",
                id: issue_id.to_string(),
            })?;
        let current = issue.escalation_level.ok_or_else(|| QuadError::InvalidTransition {
            from: "none".to_string(),
            to: EscalationLevel::Director.to_string(),
        })?;
        let next = current.next().ok_or_else(|| QuadError::InvalidTransition {
            from: current.to_string(),
            to: "above owner".to_string(),
        })?;
        if issue.status.is_terminal() {
            return Err(QuadError::InvalidTransition {
                from: issue.status.to_string(),
                to: next.to_string(),
            });
        }
        let target = self
            .targets
            .for_level(next)
            .ok_or_else(|| QuadError::SchedulerSkip(format!("no {next} configured")))?;

        match self
            .escalate(issue_id, current, next, target, self.clock.now())
            .await?
        {
            Outcome::Escalated(issue) => Ok(issue),
            Outcome::Skipped => Err(QuadError::SchedulerSkip(format!(
                "issue {issue_id} has no original message"
            ))),
        }
    }

    async fn escalate(
        &self,
        issue_id: &IssueId,
        from: EscalationLevel,
        to: EscalationLevel,
        target: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Outcome, QuadError> {
        // Re-read so a concurrent sweep or status change is seen before forwarding.
        let Some(fresh) = self.issues.find_issue(issue_id).await? else {
            debug!(issue_id = %issue_id, "issue vanished before escalation");
            return Ok(Outcome::Skipped);
        };
        if fresh.escalation_level != Some(from) || fresh.status.is_terminal() {
            debug!(issue_id = %issue_id, "issue moved since listing");
            return Ok(Outcome::Skipped);
        }

        let Some(original) = self.messages.find_original_issue_message(issue_id).await? else {
            let skip = QuadError::SchedulerSkip(format!("issue {issue_id} has no original message"));
            warn!(issue_id = %issue_id, error = %skip, "issue skipped");
            return Ok(Outcome::Skipped);
        };

        let forwarded = self.pipeline.forward(&original.id, target).await?;
        let updated = self
            .issues
            .advance_issue_escalation(issue_id, from, to, target, now)
            .await?;

        quad_prometheus::record_escalation(to);
        info!(
            issue_id = %issue_id,
            from = %from,
            to = %to,
            assignee_id = %target,
            message_id = %forwarded.id,
            "issue escalated"
        );
        Ok(Outcome::Escalated(updated))
    }
}

async fn resolve_role(
    directory: &dyn Directory,
    role: Role,
    department: Option<&str>,
) -> Option<UserId> {
    match directory.find_user_by_role(role, department).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            let skip = QuadError::SchedulerSkip(format!("no user holds role {role}"));
            warn!(%role, error = %skip, "escalation tier disabled");
            None
        }
        Err(e) => {
            warn!(%role, error = %e, "directory lookup failed, escalation tier disabled");
            None
        }
    }
}
