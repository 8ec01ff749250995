//! # teller
//!
//! Teller bank server binary: loads settings, starts the application and
//! runs until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use teller::Application;
use teller_settings::TellerSettings;
use teller_tx::NestingPolicy;

/// Teller bank server.
#[derive(Parser, Debug)]
#[command(name = "teller", about = "Transactional bank server")]
struct Cli {
    /// `SQLite` database file (overrides settings).
    #[arg(long)]
    db_file: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Nesting policy for units of work: `reuse` or `strict`.
    #[arg(long)]
    nesting: Option<NestingPolicy>,

    /// Log filter directive, e.g. `info` or `teller_tx=debug` (`RUST_LOG` wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Skip background processing of payment orders.
    #[arg(long)]
    no_coordinator: bool,
}

impl Cli {
    /// Apply command-line flags over loaded settings.
    fn apply(self, settings: &mut TellerSettings) {
        if let Some(path) = self.db_file {
            settings.database.path = path.to_string_lossy().into_owned();
        }
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(nesting) = self.nesting {
            settings.transactions.nesting = nesting;
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
        if self.no_coordinator {
            settings.coordinator.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = teller_settings::load_settings().unwrap_or_else(|e| {
        eprintln!("failed to load settings, using defaults: {e}");
        TellerSettings::default()
    });
    args.apply(&mut settings);
    teller_core::init_subscriber(&settings.logging.level);

    if teller_settings::init_settings(settings.clone()).is_err() {
        tracing::warn!("settings were already initialized");
    }

    let app = Application::new(settings)?;
    let addr = app.start().await.context("failed to start teller")?;
    tracing::info!(%addr, "press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("shutting down");

    app.stop().await
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "teller",
            "--db-file",
            "/tmp/x.db",
            "--port",
            "0",
            "--nesting",
            "STRICT",
            "--log-level",
            "debug",
            "--no-coordinator",
        ]);
        let mut settings = TellerSettings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.database.path, "/tmp/x.db");
        assert_eq!(settings.server.port, 0);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.transactions.nesting, NestingPolicy::Strict);
        assert_eq!(settings.logging.level, "debug");
        assert!(!settings.coordinator.enabled);
    }

    #[test]
    fn no_flags_keep_settings() {
        let mut settings = TellerSettings::default();
        Cli::parse_from(["teller"]).apply(&mut settings);
        assert_eq!(settings, TellerSettings::default());
    }

    #[test]
    fn bad_nesting_is_rejected() {
        assert!(Cli::try_parse_from(["teller", "--nesting", "sometimes"]).is_err());
    }
}
