// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marketplace side of Restock.
//!
//! [`RateLimitedGateway`] is the only way out to the marketplace API: it
//! enforces per-endpoint-class token buckets and retries network failures.
//! On top of it sit the typed supplies API, the coefficient
//! [`ChangeDetector`], and the move automation clients.

pub mod api;
pub mod automation;
pub mod client;
pub mod detector;
pub mod endpoints;
pub mod error;

pub use api::{AcceptanceCoefficient, Warehouse};
pub use automation::{QuotaPrecheck, RemoteAutomation};
pub use client::{GatewayRequest, GatewayResponse, RateLimitedGateway};
pub use detector::{ChangeDetector, CoefficientChange};
pub use endpoints::EndpointClass;
pub use error::GatewayError;
