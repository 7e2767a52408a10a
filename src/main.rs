//! espresso demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum (request id, trace, timeout)
//!                         │ fallback
//!                         ▼
//!                     Dispatcher ──▶ Router::find_route
//!                         │
//!                         ▼
//!                     Context parsing (params → cookies → query → body)
//!                         │
//!                         ▼
//!                     handler chain ──▶ session / user stores
//!                         │
//!     Client Response     ▼
//!     ◀────────────── Context::into_response
//! ```
//!
//! Serves the subscriber list and the session-backed account routes.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use espresso::apps::{AccountsApp, SubscriberList};
use espresso::auth::InMemoryUserStore;
use espresso::config::{load_config, EspressoConfig};
use espresso::observability::{logging, metrics};
use espresso::{HttpServer, InMemorySessionStore, Router, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "espresso", version, about = "Minimal HTTP request engine demo")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address (e.g. 127.0.0.1:5432).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EspressoConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!("espresso v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        session_ttl_secs = config.sessions.ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let subscribers = Arc::new(SubscriberList::new());
    let accounts = AccountsApp::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemorySessionStore::new()),
        config.sessions.ttl(),
    );

    let router = Router::new();
    router.register_many(subscribers.routes())?;
    router.register_many(accounts.routes())?;
    tracing::info!(routes = router.len(), "Routes registered");

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(router));
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
