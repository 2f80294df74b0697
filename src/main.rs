//! srcabl gateway binary

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use srcabl_gateway::{boot::Strap, config::Args, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("srcabl_gateway={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  srcabl gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Identity service: {}", args.identity_service_url);
    info!("Content service: {}", args.content_service_url);
    info!("Provenance service: {}", args.provenance_service_url);
    info!("RPC timeout: {}ms", args.rpc_timeout_ms);
    info!("Shutdown drain timeout: {}s", args.drain_timeout_seconds);
    info!("======================================");

    let mut strap = Strap::new(&args);
    strap.connect().await?;

    let state = Arc::new(AppState::new(
        args,
        Arc::clone(&strap.gateway),
        strap.health_probe(),
    ));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let served = server::run(state, shutdown).await;

    for failure in strap.shutdown().await {
        warn!("Shutdown: {}", failure);
    }
    info!("Gateway stopped");

    served?;
    Ok(())
}
