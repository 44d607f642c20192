use crate::config::AppConfig;
use migrations::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::{error, info};

/// Database configuration options
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 16,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a database connection pool with default options
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };
    establish_connection_with_config(config).await
}

/// Establishes a database connection pool with explicit pool tuning
pub async fn establish_connection_with_config(
    config: DbConfig,
) -> Result<DatabaseConnection, DbErr> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to database"
    );

    let mut opts = ConnectOptions::new(config.url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.acquire_timeout)
        .sqlx_logging(true);

    let pool = Database::connect(opts).await.map_err(|e| {
        error!("Failed to connect to database: {}", e);
        e
    })?;

    info!("Database connection established");
    Ok(pool)
}

/// Establishes a connection pool using settings from application config
pub async fn establish_connection_from_app_config(
    cfg: &AppConfig,
) -> Result<DatabaseConnection, DbErr> {
    establish_connection_with_config(DbConfig::from(cfg)).await
}

/// Applies all pending migrations
pub async fn run_migrations(pool: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running database migrations");
    Migrator::up(pool, None).await.map_err(|e| {
        error!("Migration failed: {}", e);
        e
    })?;
    info!("Database migrations complete");
    Ok(())
}

/// Pings the database to verify connectivity
pub async fn check_connection(pool: &DatabaseConnection) -> Result<(), DbErr> {
    pool.ping().await
}

/// Closes the connection pool gracefully
pub async fn close_pool(pool: DatabaseConnection) -> Result<(), DbErr> {
    info!("Closing database connection pool");
    pool.close().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_config_from_app_config_copies_pool_settings() {
        let mut app = AppConfig::new(
            "sqlite::memory:".into(),
            "unit_test_secret_material_long_enough_for_validation_zx91!qwerty_ok".into(),
            3600,
            86_400,
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        app.db_max_connections = 5;
        app.db_min_connections = 1;
        app.db_acquire_timeout_secs = 3;

        let db = DbConfig::from(&app);
        assert_eq!(db.url, "sqlite::memory:");
        assert_eq!(db.max_connections, 5);
        assert_eq!(db.min_connections, 1);
        assert_eq!(db.acquire_timeout, Duration::from_secs(3));
    }
}
