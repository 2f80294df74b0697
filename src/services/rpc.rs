//! JSON-over-HTTP RPC channel to a backend service
//!
//! Each call is `POST {base_url}/rpc/{Operation}` with a JSON body. The
//! channel owns one long-lived `reqwest::Client` shared by every request,
//! established by `connect` and dropped by `close`.
//!
//! Failures are wrapped with the service and operation name. There are no
//! retries and no caching here.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::session::RequestContext;
use crate::types::{GatewayError, Result, UpstreamKind};

/// Header carrying the gateway's request id to the backend
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// One backend endpoint
pub struct RpcChannel {
    service: &'static str,
    base_url: String,
    timeout: Duration,
    client: RwLock<Option<reqwest::Client>>,
}

impl RpcChannel {
    pub fn new(service: &'static str, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: RwLock::new(None),
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the HTTP client. Does not probe the backend.
    pub async fn connect(&self) -> Result<()> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.timeout)
            .user_agent(concat!("srcabl-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                GatewayError::upstream(self.service, "connect", UpstreamKind::Unavailable, e.to_string())
            })?;

        *self.client.write().await = Some(client);
        info!(service = self.service, url = %self.base_url, "RPC channel ready");
        Ok(())
    }

    /// Drop the HTTP client; later calls fail as unavailable
    pub async fn close(&self) -> Result<()> {
        match self.client.write().await.take() {
            Some(_) => {
                info!(service = self.service, "RPC channel closed");
                Ok(())
            }
            None => Err(GatewayError::Internal(format!(
                "{} channel was not connected",
                self.service
            ))),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Issue one call and decode the reply
    pub async fn call<Req, Resp>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        body: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let client = self.client.read().await.clone().ok_or_else(|| {
            GatewayError::upstream(
                self.service,
                operation,
                UpstreamKind::Unavailable,
                "channel not connected",
            )
        })?;

        if ctx.cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let url = format!("{}/rpc/{}", self.base_url, operation);
        let started = Instant::now();

        let exchange = async {
            let response = client
                .post(&url)
                .header(REQUEST_ID_HEADER, ctx.request_id.as_str())
                .json(body)
                .send()
                .await
                .map_err(|e| self.failure(operation, UpstreamKind::Unavailable, e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<Resp>()
                    .await
                    .map_err(|e| self.failure(operation, UpstreamKind::Decode, e.to_string()));
            }

            let kind = match status {
                StatusCode::NOT_FOUND => UpstreamKind::NotFound,
                StatusCode::CONFLICT => UpstreamKind::Conflict,
                _ => UpstreamKind::Rejected,
            };
            let detail = response.text().await.unwrap_or_default();
            Err(self.failure(operation, kind, format!("HTTP {}: {}", status, detail.trim())))
        };

        let result = tokio::select! {
            _ = ctx.cancel.cancelled() => Err(GatewayError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, exchange) => match outcome {
                Ok(result) => result,
                Err(_) => Err(self.failure(
                    operation,
                    UpstreamKind::Timeout,
                    format!("no reply within {}ms", self.timeout.as_millis()),
                )),
            },
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(
                service = self.service,
                operation,
                request_id = %ctx.request_id,
                elapsed_ms,
                "RPC ok"
            ),
            Err(e) => warn!(
                service = self.service,
                operation,
                request_id = %ctx.request_id,
                elapsed_ms,
                error = %e,
                "RPC failed"
            ),
        }
        result
    }

    /// Like `call`, but a NotFound reply means "absent" rather than failure
    pub async fn call_optional<Req, Resp>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        body: &Req,
    ) -> Result<Option<Resp>>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        match self.call(ctx, operation, body).await {
            Ok(resp) => Ok(Some(resp)),
            Err(e) if e.upstream_kind() == Some(UpstreamKind::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn failure(&self, operation: &'static str, kind: UpstreamKind, message: String) -> GatewayError {
        GatewayError::upstream(self.service, operation, kind, message)
    }
}
