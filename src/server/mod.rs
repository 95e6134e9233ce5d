//! HTTP server for smartsafe-gate
//!
//! Every route is served behind the admission middleware, so the router
//! built here is the only way requests reach account handlers.

pub mod middleware;
pub mod router;

pub use middleware::{admission_middleware, AuthResponse, AuthenticatedIdentity};
pub use router::{build_router, AppState, HealthResponse};

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use axum::Router;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::directory::UserDirectory;

/// Gate server, not yet bound
pub struct Server<D: UserDirectory + 'static> {
    config: ServerConfig,
    state: AppState<D>,
}

impl<D: UserDirectory + 'static> Server<D> {
    pub fn new(config: ServerConfig, state: AppState<D>) -> Self {
        Self { config, state }
    }

    /// Configured listen address
    ///
    /// The host must be an IP literal; names are not resolved.
    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .config
            .host
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.config.host.clone()))?;
        Ok(SocketAddr::new(ip, self.config.port))
    }

    /// Bind the listener and assemble the router
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let addr = self.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        if self.state.channel.assume_secure {
            tracing::warn!(
                "channel.assume_secure is set; every request is treated as arriving over TLS"
            );
        } else {
            tracing::info!(
                header = %self.state.channel.forwarded_proto_header,
                https_port = ?self.state.channel.https_port,
                "Secure channel detected from forwarded header"
            );
        }

        let app = build_router(self.state).layer(tower_http::trace::TraceLayer::new_for_http());

        Ok(BoundServer {
            listener,
            local_addr,
            app,
        })
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        self.bind().await?.serve(shutdown).await
    }
}

/// Server with a bound listener
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Router,
}

impl BoundServer {
    /// Address actually bound; differs from the configured one for port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests with graceful shutdown
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        tracing::info!(addr = %self.local_addr, "Server listening");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configured host is not an IP address
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    /// Failed to bind to address
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    /// Failed to serve requests
    #[error("Server error: {0}")]
    Serve(String),
}
