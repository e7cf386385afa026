//! PostgreSQL bootstrap
//!
//! Pool creation with a fixed-delay retry loop, and the startup
//! migration runner for `*.up.sql` files.

use sqlx::Executor;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::AppError;

const MIGRATION_SUFFIX: &str = ".up.sql";
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Build connection options from the database section of the config
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, AppError> {
    let ssl_mode: PgSslMode = config
        .sslmode
        .parse()
        .map_err(|e| AppError::Config(format!("database.sslmode: {e}")))?;

    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .ssl_mode(ssl_mode))
}

/// Run `operation` up to `attempts` times, sleeping `delay` between failures.
///
/// Returns the last error once every attempt has failed.
pub async fn retry_with_fixed_delay<T, E, F, Fut>(
    attempts: u32,
    delay: Duration,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    retry_in_secs = delay.as_secs(),
                    %error,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                tracing::error!(attempt, max_attempts = attempts, %error, "Database connection failed");
                return Err(error);
            }
        }
    }
}

/// Connect to PostgreSQL
///
/// Retries `connect_retries` times with `connect_retry_delay_seconds`
/// between attempts so the service can start alongside its database.
///
/// # Errors
/// Returns the last connection error when every attempt failed
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool, AppError> {
    let options = connect_options(config)?;
    let pool_options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT);

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        "Connecting to database..."
    );

    let pool = retry_with_fixed_delay(
        config.connect_retries,
        Duration::from_secs(config.connect_retry_delay_seconds),
        || pool_options.clone().connect_with(options.clone()),
    )
    .await?;

    tracing::info!("Database connection established");
    Ok(pool)
}

/// List migration files in execution order.
///
/// Only regular files ending in `.up.sql` are returned, sorted by file
/// name. A missing directory yields an empty list.
pub fn discover_migrations(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "Migrations directory not found");
            return Ok(Vec::new());
        }
        Err(error) => return Err(io_error(error, dir)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error(e, dir))?.path();
        let is_migration = path.is_file()
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(MIGRATION_SUFFIX));
        if is_migration {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Execute every migration in `dir` once, in file name order.
///
/// Files are sent through the simple query protocol so a single file
/// may hold several statements. Migrations are expected to be
/// idempotent since nothing records which ones already ran.
pub async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<usize, AppError> {
    tracing::info!(dir = %dir.display(), "Running database migrations...");

    let files = discover_migrations(dir)?;
    if files.is_empty() {
        tracing::info!("No migration files found");
        return Ok(0);
    }

    for file in &files {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(migration = %name, "Executing migration");

        let sql = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| io_error(e, file))?;

        pool.execute(sql.as_str()).await.map_err(|e| {
            tracing::error!(migration = %name, error = %e, "Migration failed");
            AppError::Database(e)
        })?;
    }

    tracing::info!(count = files.len(), "All migrations completed successfully");
    Ok(files.len())
}

fn io_error(error: std::io::Error, path: &Path) -> AppError {
    AppError::Internal(anyhow::Error::new(error).context(format!("{}", path.display())))
}
