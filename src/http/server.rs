//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router that hands every request to the `Dispatcher`
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve on a listener until Ctrl+C or a shutdown broadcast

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router as AxumRouter,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::EspressoConfig;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::routing::Router;

/// HTTP front end for a `Router`.
pub struct HttpServer {
    app: AxumRouter,
    config: EspressoConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving `router`.
    pub fn new(config: EspressoConfig, router: Arc<Router>) -> Self {
        let dispatcher = Dispatcher::from_config(router, &config);
        Self::with_dispatcher(config, dispatcher)
    }

    /// Serve through a preconfigured dispatcher (custom body parsers).
    pub fn with_dispatcher(config: EspressoConfig, dispatcher: Dispatcher) -> Self {
        let app = Self::build_app(&config, dispatcher);
        Self { app, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &EspressoConfig, dispatcher: Dispatcher) -> AxumRouter {
        AxumRouter::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered application, for in-process use.
    pub fn app(&self) -> AxumRouter {
        self.app.clone()
    }

    /// Run the server until Ctrl+C or a message on `shutdown`.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EspressoConfig {
        &self.config
    }
}

async fn dispatch_handler(State(dispatcher): State<Dispatcher>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}

/// Resolves on Ctrl+C or a shutdown broadcast, whichever comes first.
async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = shutdown.recv() => tracing::info!("Shutdown requested"),
    }
}
