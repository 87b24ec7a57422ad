// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Move automation collaborators.
//!
//! [`RemoteAutomation`] hands a move to the browser automation sidecar over
//! HTTP. [`QuotaPrecheck`] wraps any automation and answers NO_QUOTA
//! straight away when the API shows the target warehouse is closed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use restock_config::model::AutomationConfig;
use restock_core::types::{ExternalSession, MoveOutcome, OutcomeCode, Task};
use restock_core::{MoveAutomation, RestockError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::RateLimitedGateway;

#[derive(Debug, Serialize)]
struct MoveCommand<'a> {
    task_id: &'a str,
    session_id: &'a str,
    credentials: &'a str,
    item: &'a str,
    source_warehouse_id: i64,
    target_warehouse_id: i64,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct MoveReply {
    code: OutcomeCode,
    #[serde(default)]
    supply_id: Option<String>,
    #[serde(default)]
    diagnostic: Option<String>,
}

/// Automation sidecar reached over HTTP.
///
/// Transport failures and unexpected replies become [`MoveOutcome::Error`].
pub struct RemoteAutomation {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteAutomation {
    pub fn new(config: &AutomationConfig, timeout: Duration) -> Result<Self, RestockError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestockError::Gateway {
                message: format!("failed to build automation client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    async fn send(&self, session: &ExternalSession, task: &Task) -> Result<MoveReply, String> {
        let command = MoveCommand {
            task_id: &task.id,
            session_id: &session.id,
            credentials: &session.credentials,
            item: &task.item,
            source_warehouse_id: task.source_warehouse_id,
            target_warehouse_id: task.target_warehouse_id,
            quantity: task.quantity,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&command)
            .send()
            .await
            .map_err(|e| format!("automation request failed: {e}"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read automation reply: {e}"))?;
        if !status.is_success() {
            return Err(format!("automation returned {status}: {body}"));
        }
        serde_json::from_str(&body).map_err(|e| format!("unreadable automation reply: {e}"))
    }
}

#[async_trait]
impl MoveAutomation for RemoteAutomation {
    fn name(&self) -> &str {
        "remote"
    }

    async fn attempt_move(&self, session: &ExternalSession, task: &Task) -> MoveOutcome {
        match self.send(session, task).await {
            Ok(reply) => {
                debug!(task_id = %task.id, code = %reply.code, "automation replied");
                MoveOutcome::from_wire(reply.code, reply.supply_id, reply.diagnostic)
            }
            Err(diagnostic) => {
                warn!(task_id = %task.id, %diagnostic, "automation call failed");
                MoveOutcome::Error {
                    diagnostic: Some(diagnostic),
                }
            }
        }
    }
}

/// Checks acceptance coefficients for the target warehouse before
/// delegating to the wrapped automation.
pub struct QuotaPrecheck {
    inner: Arc<dyn MoveAutomation>,
    gateway: Arc<RateLimitedGateway>,
}

impl QuotaPrecheck {
    pub fn new(inner: Arc<dyn MoveAutomation>, gateway: Arc<RateLimitedGateway>) -> Self {
        Self { inner, gateway }
    }
}

#[async_trait]
impl MoveAutomation for QuotaPrecheck {
    fn name(&self) -> &str {
        "quota-precheck"
    }

    async fn attempt_move(&self, session: &ExternalSession, task: &Task) -> MoveOutcome {
        let warehouse = task.target_warehouse_id;
        match self.gateway.acceptance_coefficients(&[warehouse]).await {
            Ok(rows) => {
                let relevant: Vec<_> = rows.iter().filter(|c| c.warehouse_id == warehouse).collect();
                if !relevant.is_empty() && relevant.iter().all(|c| !c.is_available()) {
                    debug!(task_id = %task.id, warehouse, "no acceptance quota, skipping automation");
                    return MoveOutcome::NoQuota {
                        diagnostic: Some(format!("warehouse {warehouse} is not accepting stock")),
                    };
                }
            }
            // The precheck is an optimisation; the automation decides on its own.
            Err(e) => warn!(task_id = %task.id, error = %e, "quota precheck failed"),
        }
        self.inner.attempt_move(session, task).await
    }
}
