// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classified failures of marketplace API calls.

use std::time::Duration;

use restock_core::RestockError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// 401/403. Never retried.
    #[error("marketplace rejected credentials ({status}): {body}")]
    Auth { status: u16, body: String },

    /// 429. The caller decides whether and when to try again.
    #[error("marketplace rate limit hit{}", retry_after.map(|d| format!(", retry after {d:?}")).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    /// 404. Never retried.
    #[error("marketplace resource not found: {path}")]
    NotFound { path: String },

    /// 5xx.
    #[error("marketplace server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Connection failure or timeout that survived the retry budget, or a
    /// request that could not be sent at all.
    #[error("network error after {attempts} attempt(s): {source}")]
    Network {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Any other unexpected status or an undecodable body.
    #[error("marketplace API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl GatewayError {
    /// Suggested wait before the next call, if the server gave one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Network { .. })
    }
}

impl From<GatewayError> for RestockError {
    fn from(err: GatewayError) -> Self {
        RestockError::Gateway {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_message_mentions_wait() {
        let err = GatewayError::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        };
        assert!(err.to_string().contains("retry after 3s"), "got: {err}");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert!(!err.is_transient());
    }

    #[test]
    fn converts_into_workspace_error() {
        let err: RestockError = GatewayError::NotFound {
            path: "/api/v1/warehouses".into(),
        }
        .into();
        assert!(matches!(err, RestockError::Gateway { .. }));
        assert!(err.to_string().contains("/api/v1/warehouses"));
    }
}
