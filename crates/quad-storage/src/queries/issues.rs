// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Issue and escalation-history queries.

use chrono::{DateTime, Utc};
use quad_core::{
    EscalationEntry, EscalationLevel, Issue, IssueId, IssueStatus, QuadError, UserId,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, format_ts, map_tr_err, parse_enum, parse_ts};

const ISSUE_COLUMNS: &str =
    "id, reporter_id, assignee_id, status, escalation_level, escalated_at";

/// Outcome of a guarded escalation step.
enum Advance {
    Applied(Issue),
    Missing,
    Stale(Option<EscalationLevel>),
}

fn row_to_issue(row: &rusqlite::Row<'_>) -> rusqlite::Result<Issue> {
    let level: Option<String> = row.get(4)?;
    let escalation_level = level
        .map(|raw| {
            raw.parse::<EscalationLevel>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()?;
    Ok(Issue {
        id: IssueId(row.get(0)?),
        reporter_id: UserId(row.get(1)?),
        assignee_id: UserId(row.get(2)?),
        status: parse_enum(row, 3)?,
        escalation_level,
        escalated_at: parse_ts(row, 5)?,
        escalation_history: Vec::new(),
    })
}

fn load_history(
    conn: &rusqlite::Connection,
    issue_id: &str,
) -> rusqlite::Result<Vec<EscalationEntry>> {
    let mut stmt = conn.prepare(
        "SELECT level, user_id, escalated_at FROM escalation_history \
         WHERE issue_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![issue_id], |row| {
        Ok(EscalationEntry {
            level: parse_enum(row, 0)?,
            user_id: UserId(row.get(1)?),
            escalated_at: parse_ts(row, 2)?,
        })
    })?;
    rows.collect()
}

fn load_issue(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Issue>> {
    let issue = conn
        .query_row(
            &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
            params![id],
            row_to_issue,
        )
        .optional()?;
    match issue {
        Some(mut issue) => {
            issue.escalation_history = load_history(conn, id)?;
            Ok(Some(issue))
        }
        None => Ok(None),
    }
}

/// Insert an issue together with any history it already carries.
pub async fn insert_issue(db: &Database, issue: &Issue) -> Result<(), QuadError> {
    let issue = issue.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                &format!("INSERT INTO issues ({ISSUE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    issue.id.as_str(),
                    issue.reporter_id.as_str(),
                    issue.assignee_id.as_str(),
                    issue.status.to_string(),
                    issue.escalation_level.map(|l| l.to_string()),
                    format_ts(&issue.escalated_at),
                ],
            )?;
            for entry in &issue.escalation_history {
                tx.execute(
                    "INSERT INTO escalation_history (issue_id, level, user_id, escalated_at) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        issue.id.as_str(),
                        entry.level.to_string(),
                        entry.user_id.as_str(),
                        format_ts(&entry.escalated_at),
                    ],
                )?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch an issue with its full escalation history.
pub async fn get_issue(db: &Database, id: &IssueId) -> Result<Option<Issue>, QuadError> {
    let id = id.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Issue>, rusqlite::Error> { load_issue(conn, &id) })
        .await
        .map_err(map_tr_err)
}

/// Non-terminal issues at `level`, oldest escalation first.
pub async fn issues_at_level(
    db: &Database,
    level: EscalationLevel,
) -> Result<Vec<Issue>, QuadError> {
    let level = level.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Issue>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ISSUE_COLUMNS} FROM issues \
                 WHERE escalation_level = ?1 AND status NOT IN ('resolved', 'closed') \
                 ORDER BY escalated_at ASC"
            ))?;
            let mut issues = stmt
                .query_map(params![level], row_to_issue)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for issue in &mut issues {
                issue.escalation_history = load_history(conn, issue.id.as_str())?;
            }
            Ok(issues)
        })
        .await
        .map_err(map_tr_err)
}

/// Move an issue from `from` to `to` in one transaction.
///
/// The update is conditional on the stored level still being `from`, so a
/// concurrent sweep cannot apply the same step twice.
pub async fn advance_escalation(
    db: &Database,
    issue_id: &IssueId,
    from: EscalationLevel,
    to: EscalationLevel,
    user_id: &UserId,
    at: DateTime<Utc>,
) -> Result<Issue, QuadError> {
    if to <= from {
        return Err(QuadError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    let id = issue_id.as_str().to_string();
    let user = user_id.as_str().to_string();
    let stamp = format_ts(&at);
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Advance, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE issues SET escalation_level = ?1, assignee_id = ?2, escalated_at = ?3 \
                 WHERE id = ?4 AND escalation_level = ?5",
                params![to.to_string(), user, stamp, id, from.to_string()],
            )?;
            if changed == 0 {
                let current: Option<Option<String>> = tx
                    .query_row(
                        "SELECT escalation_level FROM issues WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?;
                return Ok(match current {
                    None => Advance::Missing,
                    Some(level) => {
                        Advance::Stale(level.and_then(|l| l.parse::<EscalationLevel>().ok()))
                    }
                });
            }
            tx.execute(
                "INSERT INTO escalation_history (issue_id, level, user_id, escalated_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, to.to_string(), user, stamp],
            )?;
            let issue = load_issue(&tx, &id)?;
            tx.commit()?;
            Ok(match issue {
                Some(issue) => Advance::Applied(issue),
                None => Advance::Missing,
            })
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        Advance::Applied(issue) => Ok(issue),
        Advance::Missing => Err(QuadError::NotFound {
            kind: "issue",
            id: issue_id.to_string(),
        }),
        Advance::Stale(current) => Err(QuadError::InvalidTransition {
            from: current
                .map(|l| l.to_string())
                .unwrap_or_else(|| "none".to_string()),
            to: to.to_string(),
        }),
    }
}

/// Set an issue's lifecycle status.
pub async fn update_status(
    db: &Database,
    issue_id: &IssueId,
    status: IssueStatus,
) -> Result<(), QuadError> {
    let id = issue_id.as_str().to_string();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE issues SET status = ?1 WHERE id = ?2",
                params![status.to_string(), id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(QuadError::NotFound {
            kind: "issue",
            id: issue_id.to_string(),
        });
    }
    Ok(())
}
