// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External session operations.

use chrono::Utc;
use restock_core::types::{ExternalSession, SessionStatus};
use restock_core::RestockError;
use rusqlite::{OptionalExtension, params};

use super::{format_ts, parse_enum, parse_opt_ts};
use crate::database::{Database, map_tr_err};

/// Insert or replace a session record.
pub async fn upsert_session(db: &Database, session: &ExternalSession) -> Result<(), RestockError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO external_sessions (id, user_id, status, expires_at, credentials, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    user_id = excluded.user_id,
                    status = excluded.status,
                    expires_at = excluded.expires_at,
                    credentials = excluded.credentials,
                    updated_at = excluded.updated_at",
                params![
                    session.id,
                    session.user_id,
                    session.status.to_string(),
                    session.expires_at.map(format_ts),
                    session.credentials,
                    format_ts(Utc::now()),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<ExternalSession>, RestockError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, user_id, status, expires_at, credentials
                 FROM external_sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ExternalSession {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        status: parse_enum(2, &row.get::<_, String>(2)?)?,
                        expires_at: parse_opt_ts(3, row.get(3)?)?,
                        credentials: row.get(4)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Flip a session to `expired`. Credentials are left untouched.
pub async fn mark_expired(db: &Database, id: &str) -> Result<bool, RestockError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE external_sessions SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, SessionStatus::Expired.to_string(), format_ts(Utc::now())],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
