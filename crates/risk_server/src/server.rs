//! Server startup and binding
//!
//! Provides functionality to start the Axum server with configurable host/port.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::{ConfigError, ServerConfig};
use crate::routes;

/// Server instance that can be started
pub struct Server {
    /// Server configuration
    config: Arc<ServerConfig>,
    /// The built router
    router: Router,
}

impl Server {
    /// Create a new server instance with the given configuration
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        let config = Arc::new(config);
        let router = routes::build_router(config.clone())?;

        Ok(Self { config, router })
    }

    /// Get the socket address the server will bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address {}: {}", self.config.socket_addr(), e),
            )
        })
    }

    /// Run the server
    ///
    /// Binds to the configured host/port and serves requests until the
    /// process receives Ctrl-C.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.run_with_listener(listener).await
    }

    /// Run the server with a specific listener
    ///
    /// Tests bind a listener to port 0 to get a random available port.
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }

    /// Create a test server and return the bound address
    #[cfg(test)]
    pub async fn spawn_test_server(config: ServerConfig) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Self::new(config).unwrap();
        let handle = tokio::spawn(async move {
            server.run_with_listener(listener).await.ok();
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        (addr, handle)
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}
