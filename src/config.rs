//! Configuration for the gateway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// srcabl gateway - front door for the identity, content and provenance services
#[derive(Parser, Debug, Clone)]
#[command(name = "gateway")]
#[command(about = "Query gateway for the srcabl backend services")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Identity service base URL
    #[arg(long, env = "IDENTITY_SERVICE_URL", default_value = "http://localhost:50051")]
    pub identity_service_url: String,

    /// Content service base URL
    #[arg(long, env = "CONTENT_SERVICE_URL", default_value = "http://localhost:50052")]
    pub content_service_url: String,

    /// Provenance service base URL
    #[arg(long, env = "PROVENANCE_SERVICE_URL", default_value = "http://localhost:50053")]
    pub provenance_service_url: String,

    /// Per-RPC timeout in milliseconds
    #[arg(long, env = "RPC_TIMEOUT_MS", default_value = "5000")]
    pub rpc_timeout_ms: u64,

    /// Name of the session cookie
    #[arg(long, env = "SESSION_COOKIE_NAME", default_value = "uid")]
    pub session_cookie_name: String,

    /// Session lifetime in seconds
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value = "86400")]
    pub session_ttl_seconds: u64,

    /// Seconds in-flight requests get to finish after a shutdown signal
    #[arg(long, env = "DRAIN_TIMEOUT_SECONDS", default_value = "10")]
    pub drain_timeout_seconds: u64,

    /// Mark the session cookie Secure (required outside dev mode)
    #[arg(long, env = "COOKIE_SECURE")]
    pub cookie_secure: Option<bool>,

    /// Origin allowed to make credentialed cross-origin requests
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Enable development mode (relaxed cookie requirements)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,
}

/// Where the three backend services live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub identity: String,
    pub content: String,
    pub provenance: String,
}

impl Args {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }

    pub fn services(&self) -> ServiceEndpoints {
        ServiceEndpoints {
            identity: self.identity_service_url.clone(),
            content: self.content_service_url.clone(),
            provenance: self.provenance_service_url.clone(),
        }
    }

    /// Effective Secure flag for the session cookie
    pub fn secure_cookie(&self) -> bool {
        self.cookie_secure.unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [
            ("IDENTITY_SERVICE_URL", &self.identity_service_url),
            ("CONTENT_SERVICE_URL", &self.content_service_url),
            ("PROVENANCE_SERVICE_URL", &self.provenance_service_url),
        ] {
            let parsed = reqwest::Url::parse(url).map_err(|e| format!("{name} is not a valid URL: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!("{name} must be an http(s) URL, got {}", parsed.scheme()));
            }
        }

        if self.rpc_timeout_ms == 0 {
            return Err("RPC_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.session_ttl_seconds == 0 || self.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(format!(
                "SESSION_TTL_SECONDS must be between 1 and {}, got {}",
                MAX_SESSION_TTL_SECONDS, self.session_ttl_seconds
            ));
        }

        if self.session_cookie_name.is_empty()
            || self
                .session_cookie_name
                .chars()
                .any(|c| c == '=' || c == ';' || c == ',' || c.is_whitespace() || c.is_control())
        {
            return Err(format!(
                "SESSION_COOKIE_NAME {:?} is not a valid cookie name",
                self.session_cookie_name
            ));
        }

        if !matches!(self.log_format.to_ascii_lowercase().as_str(), "text" | "json") {
            return Err(format!("LOG_FORMAT must be text or json, got {}", self.log_format));
        }

        if !self.dev_mode && self.cookie_secure.is_none() {
            return Err("COOKIE_SECURE is required in production mode".to_string());
        }

        Ok(())
    }
}
