// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User directory queries.

use quad_core::{QuadError, Role, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Insert or replace a directory entry.
pub async fn upsert_user(
    db: &Database,
    id: &UserId,
    name: &str,
    role: Role,
    department: Option<&str>,
) -> Result<(), QuadError> {
    let id = id.as_str().to_string();
    let name = name.to_string();
    let department = department.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO users (id, name, role, department) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, role = excluded.role, \
                 department = excluded.department",
                params![id, name, role.to_string(), department],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// First user holding `role`, optionally restricted to a department.
pub async fn find_by_role(
    db: &Database,
    role: Role,
    department: Option<&str>,
) -> Result<Option<UserId>, QuadError> {
    let department = department.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<Option<UserId>, rusqlite::Error> {
            conn.query_row(
                "SELECT id FROM users WHERE role = ?1 AND (?2 IS NULL OR department = ?2) \
                 ORDER BY id ASC LIMIT 1",
                params![role.to_string(), department],
                |row| row.get::<_, String>(0).map(UserId),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
