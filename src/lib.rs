//! srcabl gateway
//!
//! Translates named queries and mutations into calls against the identity,
//! content and provenance services, and folds their results into response
//! envelopes that tolerate partial failure.

pub mod auth;
pub mod boot;
pub mod config;
pub mod gateway;
pub mod model;
pub mod routes;
pub mod server;
pub mod services;
pub mod session;
pub mod types;
pub mod validation;

pub use config::Args;
pub use gateway::{Gateway, ResponseEnvelope};
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
