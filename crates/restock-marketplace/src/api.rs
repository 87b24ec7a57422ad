// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed calls against the marketplace supplies API.

use serde::{Deserialize, Serialize};

use crate::client::{GatewayRequest, RateLimitedGateway};
use crate::endpoints::EndpointClass;
use crate::error::GatewayError;

pub const COEFFICIENTS_PATH: &str = "/api/v1/acceptance/coefficients";
pub const WAREHOUSES_PATH: &str = "/api/v1/warehouses";

/// Acceptance cost of one warehouse on one date for one box type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceCoefficient {
    pub date: String,
    /// -1 unavailable, 0 free, N an N-fold acceptance fee.
    pub coefficient: f64,
    #[serde(rename = "warehouseID")]
    pub warehouse_id: i64,
    #[serde(default)]
    pub warehouse_name: String,
    #[serde(default = "default_allow_unload")]
    pub allow_unload: bool,
    #[serde(default, rename = "boxTypeID")]
    pub box_type_id: Option<i64>,
}

fn default_allow_unload() -> bool {
    true
}

impl AcceptanceCoefficient {
    /// Integer cost factor; -1 when the warehouse does not accept stock.
    pub fn cost_factor(&self) -> i64 {
        if !self.allow_unload || self.coefficient < 0.0 {
            -1
        } else {
            self.coefficient.round() as i64
        }
    }

    pub fn is_available(&self) -> bool {
        self.cost_factor() >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, rename = "workTime")]
    pub work_time: String,
    #[serde(default, rename = "acceptsQR")]
    pub accepts_qr: bool,
}

impl RateLimitedGateway {
    /// Acceptance coefficients, optionally restricted to `warehouse_ids`.
    pub async fn acceptance_coefficients(
        &self,
        warehouse_ids: &[i64],
    ) -> Result<Vec<AcceptanceCoefficient>, GatewayError> {
        let mut request = GatewayRequest::get(COEFFICIENTS_PATH);
        if !warehouse_ids.is_empty() {
            let ids = warehouse_ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            request = request.query("warehouseIDs", ids);
        }
        self.get_json(EndpointClass::Coefficients, request).await
    }

    pub async fn warehouses(&self) -> Result<Vec<Warehouse>, GatewayError> {
        self.get_json(EndpointClass::Warehouses, GatewayRequest::get(WAREHOUSES_PATH))
            .await
    }
}
