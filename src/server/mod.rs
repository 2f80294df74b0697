//! HTTP server

pub mod cookies;
pub mod http;

pub use http::{handle_request, run, serve, AppState};
