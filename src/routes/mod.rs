//! HTTP routes for the gateway

pub mod health;
pub mod query;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::GatewayError;

pub use health::health_check;
pub use query::handle_query;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Error body for hard failures
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::Field(field_error) => Self {
                error: field_error.message.clone(),
                field: field_error.field.clone(),
            },
            other => Self {
                error: other.to_string(),
                field: None,
            },
        }
    }
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub fn error_response(err: &GatewayError) -> Response<BoxBody> {
    json_response(err.status_code(), &ErrorResponse::from(err))
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("Not found: {}", path),
            field: None,
        },
    )
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Read and decode a JSON body, refusing anything over [`MAX_BODY_BYTES`]
pub async fn parse_json_body<B, T>(req: Request<B>) -> Result<T, GatewayError>
where
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
    T: DeserializeOwned,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                GatewayError::PayloadTooLarge(MAX_BODY_BYTES)
            } else {
                GatewayError::BadRequest(format!("Failed to read body: {}", e))
            }
        })?;

    Ok(serde_json::from_slice(&body.to_bytes())?)
}
