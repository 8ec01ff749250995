//! `RestServer`: the Axum listener with a one-shot lifecycle.

use std::net::SocketAddr;

use parking_lot::Mutex;
use teller_core::Lifecycle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::errors::{Result, ServerError};
use crate::routes::{self, AppState};

struct Listening {
    addr: SocketAddr,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Serves the REST routes until stopped.
pub struct RestServer {
    config: ServerConfig,
    state: AppState,
    lifecycle: Lifecycle,
    listening: Mutex<Option<Listening>>,
}

impl RestServer {
    /// Create a stopped server.
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            lifecycle: Lifecycle::new("rest server"),
            listening: Mutex::new(None),
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the listener and start serving in the background.
    ///
    /// Returns the bound address (useful with port `0`).
    pub async fn start(&self) -> Result<SocketAddr> {
        self.lifecycle.start()?;
        let listener = match TcpListener::bind(self.config.bind_address()).await {
            Ok(listener) => listener,
            Err(e) => {
                self.lifecycle.abort_start();
                return Err(e.into());
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.lifecycle.abort_start();
                return Err(e.into());
            }
        };

        let token = CancellationToken::new();
        let shutdown = token.clone();
        let app = routes::router(self.state.clone());
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
            {
                warn!(error = %e, "rest server terminated with error");
            }
        });

        *self.listening.lock() = Some(Listening { addr, token, handle });
        info!(%addr, "rest server listening");
        Ok(addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn stop(&self) -> Result<()> {
        self.lifecycle.stop()?;
        let Some(mut listening) = self.listening.lock().take() else {
            return Ok(());
        };
        listening.token.cancel();
        let timeout = self.config.shutdown_timeout();
        if tokio::time::timeout(timeout, &mut listening.handle).await.is_err() {
            warn!(?timeout, "rest server did not drain in time, aborting");
            listening.handle.abort();
        }
        info!(addr = %listening.addr, "rest server stopped");
        Ok(())
    }

    /// Whether the server is serving.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listening
            .lock()
            .as_ref()
            .map(|l| l.addr)
            .ok_or(ServerError::NotRunning)
    }
}

impl std::fmt::Debug for RestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestServer")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
