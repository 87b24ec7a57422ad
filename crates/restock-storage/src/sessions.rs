// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed [`SessionStore`].

use async_trait::async_trait;
use tracing::info;

use restock_core::types::ExternalSession;
use restock_core::{RestockError, SessionStore};

use crate::database::Database;
use crate::queries::sessions;

pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register or refresh a session handed over by the automation side.
    pub async fn upsert(&self, session: &ExternalSession) -> Result<(), RestockError> {
        sessions::upsert_session(&self.db, session).await
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_session(&self, id: &str) -> Result<Option<ExternalSession>, RestockError> {
        sessions::get_session(&self.db, id).await
    }

    async fn deactivate_session(&self, id: &str) -> Result<(), RestockError> {
        if sessions::mark_expired(&self.db, id).await? {
            info!(session_id = id, "session deactivated");
            Ok(())
        } else {
            Err(RestockError::NotFound {
                entity: "session",
                id: id.to_string(),
            })
        }
    }
}
