use std::sync::Arc;

use evenue_core::config::{AppConfig, ConfigError, LoadOptions};
use evenue_core::dialog::{CarrierSealer, DialogMachine};
use evenue_db::{connect, migrations, DbPool, SqlBookingStore, SqlEntityGateway, SqlEventCatalog};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub machine: Arc<DialogMachine>,
    pub gateway: Arc<SqlEntityGateway>,
    pub catalog: Arc<SqlEventCatalog>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl Application {
    /// One router for all three surfaces: webhook, catalog API, health.
    pub fn router(&self) -> axum::Router {
        crate::webhook::router(self.machine.clone())
            .merge(crate::catalog::router(self.gateway.clone(), self.catalog.clone()))
            .merge(crate::health::router(self.db_pool.clone()))
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let sealer = config.webhook.carrier_secret.clone().map(CarrierSealer::new);
    if sealer.is_some() {
        info!(
            event_name = "system.bootstrap.carrier_sealing_enabled",
            correlation_id = "bootstrap",
            "carrier sealing enabled for webhook contexts"
        );
    }

    let gateway = Arc::new(SqlEntityGateway::new(db_pool.clone()));
    let store = Arc::new(SqlBookingStore::new(db_pool.clone()));
    let machine = Arc::new(DialogMachine::new(gateway.clone(), store, sealer));
    let catalog = Arc::new(SqlEventCatalog::new(db_pool.clone()));

    Ok(Application { config, db_pool, machine, gateway, catalog })
}

#[cfg(test)]
mod tests {
    use evenue_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_exposes_the_booking_tables() {
        let app = bootstrap(memory_options()).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('users', 'events', 'ticket_types', 'tickets')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables to be available after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose the booking-path tables");

        let _ = app.router();

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_invalid_config() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://nope".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("invalid config must fail").to_string();
        assert!(message.contains("database.url"));
    }
}
