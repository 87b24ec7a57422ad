// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Endpoint classes and their request budgets.

use std::time::Duration;

use restock_config::model::{EndpointLimit, MarketplaceConfig};
use restock_resilience::TokenBucket;
use strum::Display;

/// Group of marketplace endpoints sharing one advertised rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum EndpointClass {
    /// Acceptance coefficient lookups.
    Coefficients,
    Warehouses,
    Supplies,
    General,
}

impl EndpointClass {
    pub fn limit(self, config: &MarketplaceConfig) -> EndpointLimit {
        match self {
            EndpointClass::Coefficients => config.coefficients_limit,
            EndpointClass::Warehouses => config.warehouses_limit,
            EndpointClass::Supplies => config.supplies_limit,
            EndpointClass::General => config.general_limit,
        }
    }
}

/// One token bucket per endpoint class.
#[derive(Debug)]
pub struct EndpointBuckets {
    coefficients: TokenBucket,
    warehouses: TokenBucket,
    supplies: TokenBucket,
    general: TokenBucket,
}

impl EndpointBuckets {
    pub fn from_config(config: &MarketplaceConfig) -> Self {
        let bucket = |class: EndpointClass| {
            let limit = class.limit(config);
            TokenBucket::for_limit(
                limit.requests,
                Duration::from_secs(limit.period_secs),
                config.safety_margin,
            )
        };
        Self {
            coefficients: bucket(EndpointClass::Coefficients),
            warehouses: bucket(EndpointClass::Warehouses),
            supplies: bucket(EndpointClass::Supplies),
            general: bucket(EndpointClass::General),
        }
    }

    pub fn get(&self, class: EndpointClass) -> &TokenBucket {
        match class {
            EndpointClass::Coefficients => &self.coefficients,
            EndpointClass::Warehouses => &self.warehouses,
            EndpointClass::Supplies => &self.supplies,
            EndpointClass::General => &self.general,
        }
    }
}
