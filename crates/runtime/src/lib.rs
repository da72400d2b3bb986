use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

use intercom_config::AppConfig;
use intercom_database::{initialize_database, SessionRepository, SqliteMembership, SqliteStore};
use intercom_realtime::{Authenticator, RealtimeEngine};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub engine: Arc<RealtimeEngine>,
    pub authenticator: Arc<dyn Authenticator>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let store = Arc::new(SqliteStore::new(db_pool.clone()));
        let membership = Arc::new(SqliteMembership::new(db_pool.clone()));
        let engine = Arc::new(RealtimeEngine::new(store, membership));
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(SessionRepository::new(db_pool.clone()));

        info!("realtime engine ready");

        Ok(Self {
            db_pool,
            engine,
            authenticator,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
