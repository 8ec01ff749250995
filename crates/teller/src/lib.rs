//! # teller
//!
//! Application wiring for the teller bank server.
//!
//! [`Application`] owns every long-lived component and starts them in
//! dependency order:
//!
//! 1. database pool
//! 2. schema bootstrap (first start against an empty file only)
//! 3. bank initializer (internal top-up and withdrawal accounts)
//! 4. transactor
//! 5. REST server
//! 6. coordinator task (when enabled)
//!
//! [`Application::stop`] tears them down in reverse.

#![deny(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use parking_lot::Mutex;
use teller_bank::{
    AccountService, BankInitializer, Context, Coordinator, Executor, PROBE_TABLE,
    PaymentOrderService, SCHEMA_SCRIPT, SCRIPTS, Transactor,
};
use teller_db::{ConnectionConfig, Database, SchemaBootstrapper};
use teller_server::{AppState, RestServer, ServerConfig, spawn_coordinator};
use teller_settings::{DatabaseSettings, TellerSettings, resolve_home_path};
use teller_tx::TransactionExecutor;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

struct Background {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// The assembled bank server.
pub struct Application {
    settings: TellerSettings,
    database: Arc<Database>,
    executor: Arc<Executor>,
    transactor: Arc<Transactor>,
    coordinator: Arc<Coordinator>,
    server: RestServer,
    background: Mutex<Option<Background>>,
}

/// Pool settings taken from the `database` settings section.
pub fn connection_config(settings: &DatabaseSettings) -> ConnectionConfig {
    ConnectionConfig {
        pool_size: settings.pool_size,
        busy_timeout_ms: settings.busy_timeout_ms,
        cache_size_kib: settings.cache_size_kib,
        connection_timeout_ms: settings.connection_timeout_ms,
    }
}

impl Application {
    /// Build every component. Nothing is started yet.
    pub fn new(settings: TellerSettings) -> Result<Self> {
        settings.validate().context("invalid settings")?;

        let path = resolve_home_path(&settings.database.path);
        let database = Arc::new(
            Database::new(&path, connection_config(&settings.database))
                .with_context(|| format!("failed to open database at {}", path.display()))?,
        );
        let executor = Arc::new(TransactionExecutor::new(
            Arc::clone(&database),
            settings.transactions.nesting,
        ));
        let transactor = Arc::new(Transactor::new(Arc::clone(&executor)));
        let coordinator = Arc::new(Coordinator::new(
            PaymentOrderService::new(Arc::clone(&executor)),
            Arc::clone(&transactor),
            settings.coordinator.workers,
        ));
        let server = RestServer::new(
            ServerConfig::from_settings(&settings.server),
            AppState::new(&executor, Arc::clone(&transactor)),
        );

        Ok(Self {
            settings,
            database,
            executor,
            transactor,
            coordinator,
            server,
            background: Mutex::new(None),
        })
    }

    /// Start every component; returns the REST listener address.
    pub async fn start(&self) -> Result<SocketAddr> {
        info!(
            db = %self.database.path().display(),
            nesting = %self.executor.policy(),
            "starting teller"
        );

        let database = Arc::clone(&self.database);
        let executor = Arc::clone(&self.executor);
        let bank = self.settings.bank.clone();
        tokio::task::spawn_blocking(move || prepare_storage(&database, executor, bank))
            .await
            .context("storage start-up task failed")??;

        self.transactor.start();
        let addr = self.server.start().await.context("failed to start REST server")?;

        if self.settings.coordinator.enabled {
            let token = CancellationToken::new();
            let handle = spawn_coordinator(
                Arc::clone(&self.coordinator),
                &self.settings.coordinator,
                token.clone(),
            );
            *self.background.lock() = Some(Background { token, handle });
        } else {
            info!("coordinator disabled");
        }

        info!(%addr, "teller started");
        Ok(addr)
    }

    /// Stop every component in reverse start order.
    pub async fn stop(&self) -> Result<()> {
        let background = self.background.lock().take();
        if let Some(background) = background {
            background.token.cancel();
            if let Err(e) = background.handle.await {
                warn!(error = %e, "coordinator task failed");
            }
        }
        self.server.stop().await.context("failed to stop REST server")?;
        self.transactor.stop();
        self.database.stop().context("failed to stop database")?;
        info!("teller stopped");
        Ok(())
    }

    /// Settings the application was built with.
    pub fn settings(&self) -> &TellerSettings {
        &self.settings
    }

    /// The shared transaction executor.
    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    /// The database connection source.
    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    /// Account service over the shared executor.
    pub fn accounts(&self) -> AccountService {
        AccountService::new(Arc::clone(&self.executor))
    }

    /// The REST server.
    pub fn server(&self) -> &RestServer {
        &self.server
    }
}

/// Start the pool, create the schema if missing and open internal accounts.
fn prepare_storage(
    database: &Arc<Database>,
    executor: Arc<Executor>,
    bank: teller_settings::BankSettings,
) -> Result<()> {
    database.start().context("failed to start database")?;
    let created = SchemaBootstrapper::new(Arc::clone(database), SCRIPTS, SCHEMA_SCRIPT, PROBE_TABLE)
        .ensure_initialized()
        .context("failed to initialize schema")?;
    if created {
        info!("database schema created");
    }
    let opened = BankInitializer::new(executor, bank)
        .init(&Context::new())
        .context("failed to initialize bank accounts")?;
    if opened > 0 {
        info!(opened, "bank accounts initialized");
    }
    Ok(())
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("database", &self.database)
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_config_copies_database_settings() {
        let settings = DatabaseSettings {
            pool_size: 3,
            busy_timeout_ms: 100,
            cache_size_kib: 64,
            connection_timeout_ms: 250,
            ..DatabaseSettings::default()
        };
        assert_eq!(
            connection_config(&settings),
            ConnectionConfig {
                pool_size: 3,
                busy_timeout_ms: 100,
                cache_size_kib: 64,
                connection_timeout_ms: 250,
            }
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut settings = TellerSettings::default();
        settings.database.pool_size = 0;
        assert!(Application::new(settings).is_err());
    }
}
