//! Liveness endpoint
//!
//! `healthy` is true whenever the process answers. `connected` reports
//! whether every backend channel is currently established.

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::boot::HealthProbe;
use crate::routes::{json_response, BoxBody};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub connected: bool,
}

pub async fn health_check(probe: &HealthProbe) -> Response<BoxBody> {
    let body = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        connected: probe.connected().await,
    };
    json_response(StatusCode::OK, &body)
}
