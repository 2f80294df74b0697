//! Error types for the gateway
//!
//! Hard errors only. Validation problems and upstream failures on
//! envelope-returning operations travel as [`FieldError`]s inside the
//! response envelope instead.

use std::fmt;

use hyper::StatusCode;

use crate::model::FieldError;

/// How a backend call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Channel not connected or request could not be sent
    Unavailable,
    /// Per-RPC deadline elapsed
    Timeout,
    /// Backend reported the target as missing
    NotFound,
    /// Backend refused because the entity already exists
    Conflict,
    /// Backend answered with any other failure status
    Rejected,
    /// Backend answered with a body we could not decode
    Decode,
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamKind::Unavailable => write!(f, "unavailable"),
            UpstreamKind::Timeout => write!(f, "timeout"),
            UpstreamKind::NotFound => write!(f, "not found"),
            UpstreamKind::Conflict => write!(f, "conflict"),
            UpstreamKind::Rejected => write!(f, "rejected"),
            UpstreamKind::Decode => write!(f, "decode"),
        }
    }
}

/// Main error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Field(FieldError),

    #[error("{service}.{operation} failed: {message}")]
    Upstream {
        service: &'static str,
        operation: &'static str,
        kind: UpstreamKind,
        message: String,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("{component}: {source}")]
    Component {
        component: String,
        #[source]
        source: Box<GatewayError>,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for a wrapped backend failure
    pub fn upstream(
        service: &'static str,
        operation: &'static str,
        kind: UpstreamKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            service,
            operation,
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a field-scoped hard failure
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Field(FieldError::new(field, message))
    }

    /// Attribute a failure to a named lifecycle component
    pub fn in_component(self, component: impl Into<String>) -> Self {
        Self::Component {
            component: component.into(),
            source: Box::new(self),
        }
    }

    /// The upstream failure kind, if this is a backend error
    pub fn upstream_kind(&self) -> Option<UpstreamKind> {
        match self {
            Self::Upstream { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Field(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream { kind, .. } => match kind {
                UpstreamKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                UpstreamKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            // Client closed request
            Self::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Component { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for GatewayError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
