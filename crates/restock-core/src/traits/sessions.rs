// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to external marketplace sessions.

use async_trait::async_trait;

use crate::error::RestockError;
use crate::types::ExternalSession;

/// Store of collaborator-owned sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a session by its handle.
    async fn get_session(&self, id: &str) -> Result<Option<ExternalSession>, RestockError>;

    /// Mark a session expired so no further task uses it until the user
    /// re-authenticates.
    async fn deactivate_session(&self, id: &str) -> Result<(), RestockError>;
}
