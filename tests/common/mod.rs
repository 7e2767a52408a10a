//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use espresso::apps::{AccountsApp, SubscriberList};
use espresso::auth::InMemoryUserStore;
use espresso::{EspressoConfig, HttpServer, InMemorySessionStore, Router, Shutdown};

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `router` with default configuration.
pub async fn start_server(router: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let mut config = EspressoConfig::default();
    config.server.bind_address = addr.to_string();
    let server = HttpServer::new(config, Arc::new(router));

    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestServer { addr, shutdown }
}

/// Serve the subscriber and account demo applications.
#[allow(dead_code)]
pub async fn start_demo_server() -> TestServer {
    let subscribers = Arc::new(SubscriberList::new());
    let accounts = AccountsApp::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemorySessionStore::new()),
        Duration::from_secs(60),
    );

    let router = Router::new();
    router.register_many(subscribers.routes()).unwrap();
    router.register_many(accounts.routes()).unwrap();
    start_server(router).await
}

/// A client that keeps no connections around between tests.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// A client with a cookie jar, for session flows.
#[allow(dead_code)]
pub fn cookie_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
