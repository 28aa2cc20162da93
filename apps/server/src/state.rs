//! Shared application state

use crate::config::Config;
use crate::db::{BlueprintRepository, PrefabRepository};
use crate::{Error, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: PgPool,
    pub blueprints: BlueprintRepository,
    pub prefabs: PrefabRepository,
}

impl AppState {
    /// Connect the database pool and run pending migrations when
    /// `database.run_migrations` is set.
    pub async fn new(config: Config) -> Result<Self> {
        let db_pool = PgPoolOptions::new()
            .min_connections(config.database.pool_min_size)
            .max_connections(config.database.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.database.pool_timeout_seconds))
            .connect(&config.database.url)
            .await
            .map_err(Error::Database)?;

        tracing::info!(
            min_connections = config.database.pool_min_size,
            max_connections = config.database.pool_max_size,
            "Database pool created"
        );

        if config.database.run_migrations {
            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .map_err(|e| Error::Internal(format!("Failed to run migrations: {e}")))?;
            tracing::info!("Database migrations applied");
        }

        Ok(Self::from_pool(config, db_pool))
    }

    pub fn from_pool(config: Config, db_pool: PgPool) -> Self {
        Self {
            config: Arc::new(config),
            blueprints: BlueprintRepository::new(db_pool.clone()),
            prefabs: PrefabRepository::new(db_pool.clone()),
            db_pool,
        }
    }
}
