// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence queries.

use quad_core::{IssueId, Message, MessageId, MessageStatus, QuadError, UserId};
use rusqlite::params;

use crate::database::{Database, format_ts, map_tr_err, parse_enum, parse_ts};

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, text, media, status, issue_id, \
     is_original_issue_message, auto_forwarded, forward_count, original_message_id, created_at";

/// Outcome of a guarded status update.
enum StatusUpdate {
    Applied,
    Missing,
    Rejected(MessageStatus),
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let media_json: String = row.get(4)?;
    let media: Vec<String> = serde_json::from_str(&media_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Message {
        id: MessageId(row.get(0)?),
        sender_id: UserId(row.get(1)?),
        receiver_id: UserId(row.get(2)?),
        text: row.get(3)?,
        media,
        status: parse_enum(row, 5)?,
        issue_id: row.get::<_, Option<String>>(6)?.map(IssueId),
        is_original_issue_message: row.get(7)?,
        auto_forwarded: row.get(8)?,
        forward_count: row.get(9)?,
        original_message_id: row.get::<_, Option<String>>(10)?.map(MessageId),
        created_at: parse_ts(row, 11)?,
    })
}

/// Insert a new message row.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), QuadError> {
    let media = serde_json::to_string(&msg.media).map_err(QuadError::persistence)?;
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                &format!(
                    "INSERT INTO messages ({MESSAGE_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    msg.id.as_str(),
                    msg.sender_id.as_str(),
                    msg.receiver_id.as_str(),
                    msg.text,
                    media,
                    msg.status.to_string(),
                    msg.issue_id.as_ref().map(|i| i.as_str().to_string()),
                    msg.is_original_issue_message,
                    msg.auto_forwarded,
                    msg.forward_count,
                    msg.original_message_id.as_ref().map(|m| m.as_str().to_string()),
                    format_ts(&msg.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by id.
pub async fn get_message(db: &Database, id: &MessageId) -> Result<Option<Message>, QuadError> {
    let id = id.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"))?;
            let mut rows = stmt.query_map(params![id], row_to_message)?;
            rows.next().transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Move a message's status forward. Regressions and unknown ids are rejected.
///
/// The read and the write run in one closure on the writer thread, so two
/// racing updates cannot both pass the guard.
pub async fn update_status(
    db: &Database,
    id: &MessageId,
    status: MessageStatus,
) -> Result<(), QuadError> {
    let key = id.as_str().to_string();
    let outcome = db
        .connection()
        .call(move |conn| -> Result<StatusUpdate, rusqlite::Error> {
            let current: Option<String> = conn
                .query_row(
                    "SELECT status FROM messages WHERE id = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            let Some(current) = current else {
                return Ok(StatusUpdate::Missing);
            };
            let current: MessageStatus = current.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            if !current.can_advance_to(status) {
                return Ok(StatusUpdate::Rejected(current));
            }
            conn.execute(
                "UPDATE messages SET status = ?1 WHERE id = ?2",
                params![status.to_string(), key],
            )?;
            Ok(StatusUpdate::Applied)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        StatusUpdate::Applied => Ok(()),
        StatusUpdate::Missing => Err(QuadError::NotFound {
            kind: "message",
            id: id.to_string(),
        }),
        StatusUpdate::Rejected(current) => Err(QuadError::InvalidTransition {
            from: current.to_string(),
            to: status.to_string(),
        }),
    }
}

/// Messages between two users, oldest first. With a limit, the most recent
/// `limit` messages are returned.
pub async fn conversation(
    db: &Database,
    a: &UserId,
    b: &UserId,
    limit: Option<u32>,
) -> Result<Vec<Message>, QuadError> {
    let a = a.as_str().to_string();
    let b = b.as_str().to_string();
    // SQLite treats a negative LIMIT as unbounded.
    let limit: i64 = limit.map(i64::from).unwrap_or(-1);
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM ( \
                     SELECT {MESSAGE_COLUMNS}, rowid AS seq FROM messages \
                     WHERE (sender_id = ?1 AND receiver_id = ?2) \
                        OR (sender_id = ?2 AND receiver_id = ?1) \
                     ORDER BY created_at DESC, seq DESC LIMIT ?3 \
                 ) ORDER BY created_at ASC, seq ASC"
            ))?;
            let rows = stmt.query_map(params![a, b, limit], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// The message flagged as the original report for an issue.
pub async fn original_issue_message(
    db: &Database,
    issue_id: &IssueId,
) -> Result<Option<Message>, QuadError> {
    let issue_id = issue_id.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages \
                 WHERE issue_id = ?1 AND is_original_issue_message = 1 \
                 ORDER BY created_at ASC LIMIT 1"
            ))?;
            let mut rows = stmt.query_map(params![issue_id], row_to_message)?;
            rows.next().transpose()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    async fn db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn msg(from: &str, to: &str, text: &str, secs: i64) -> Message {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs);
        Message::new(from.into(), to.into(), text, vec!["a.png".into()], at)
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let db = db().await;
        let mut m = msg("u1", "u2", "hi", 0);
        m.issue_id = Some("i1".into());
        m.is_original_issue_message = true;
        insert_message(&db, &m).await.unwrap();
        let loaded = get_message(&db, &m.id).await.unwrap().unwrap();
        assert_eq!(loaded, m);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let db = db().await;
        assert!(get_message(&db, &"nope".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_moves_forward_only() {
        let db = db().await;
        let m = msg("u1", "u2", "hi", 0);
        insert_message(&db, &m).await.unwrap();

        update_status(&db, &m.id, MessageStatus::Sent).await.unwrap();
        update_status(&db, &m.id, MessageStatus::Read).await.unwrap();
        let err = update_status(&db, &m.id, MessageStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, QuadError::InvalidTransition { .. }));

        let loaded = get_message(&db, &m.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn status_update_on_unknown_message_is_not_found() {
        let db = db().await;
        let err = update_status(&db, &"ghost".into(), MessageStatus::Sent)
            .await
            .unwrap_err();
        assert!(matches!(err, QuadError::NotFound { kind: "message", .. }));
    }

    #[tokio::test]
    async fn conversation_is_symmetric_and_ordered() {
        let db = db().await;
        let a = msg("u1", "u2", "one", 0);
        let b = msg("u2", "u1", "two", 1);
        let c = msg("u1", "u3", "other", 2);
        let d = msg("u1", "u2", "three", 3);
        for m in [&d, &a, &c, &b] {
            insert_message(&db, m).await.unwrap();
        }

        let texts: Vec<String> = conversation(&db, &"u2".into(), &"u1".into(), None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);

        let recent: Vec<String> = conversation(&db, &"u1".into(), &"u2".into(), Some(2))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(recent, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn finds_original_issue_message() {
        let db = db().await;
        let mut original = msg("u1", "boss", "broken", 0);
        original.issue_id = Some("i9".into());
        original.is_original_issue_message = true;
        let mut followup = msg("u1", "boss", "still broken", 5);
        followup.issue_id = Some("i9".into());
        insert_message(&db, &followup).await.unwrap();
        insert_message(&db, &original).await.unwrap();

        let found = original_issue_message(&db, &"i9".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, original.id);
        assert!(
            original_issue_message(&db, &"i10".into())
                .await
                .unwrap()
                .is_none()
        );
    }
}
