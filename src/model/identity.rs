//! 128-bit identifiers shared by users, posts, links and sources

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of every backend identifier in bytes
pub const IDENTITY_LEN: usize = 16;

/// Opaque fixed-length identifier issued by a backend service.
///
/// The gateway never mints these for persisted entities; it only parses
/// them from clients, decodes them from backend payloads and ferries them
/// between services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Uuid);

/// Why a value could not be read as an [`Identity`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid identifier length {0}, expected {IDENTITY_LEN} bytes")]
    Length(usize),

    #[error("invalid identifier text: {0}")]
    Text(String),
}

impl Identity {
    /// Decode raw bytes as returned by a backend
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| IdentityError::Length(bytes.len()))
    }

    /// Parse the display form supplied by a client
    pub fn parse_str(value: &str) -> Result<Self, IdentityError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|e| IdentityError::Text(e.to_string()))
    }

    /// Generate a fresh random identifier (used by test doubles)
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        self.0.as_bytes()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
