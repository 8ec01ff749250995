//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use teller_settings::ServerSettings;

/// Configuration for the REST server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (`0` picks an ephemeral port).
    pub port: u16,
    /// How long `stop()` waits for in-flight requests before giving up.
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Listener settings taken from the loaded settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            ..Self::default()
        }
    }

    /// `host:port` as passed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Graceful shutdown budget.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            shutdown_timeout_secs: 10,
        }
    }
}
