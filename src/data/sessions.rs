//! Session storage backends
//!
//! Records live in `tower_sessions.session`, created by the shipped
//! migrations, and are read and written by [`PostgresStore`].

use std::time::Duration;

use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

use super::database::{connect_with_retry, run_migrations};
use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::metrics::SESSION_SWEEPS_TOTAL;

/// Connect, migrate and wrap the pool in a session store
///
/// # Errors
/// Returns error if the database stays unreachable or a migration fails
pub async fn connect_session_store(config: &DatabaseConfig) -> Result<PostgresStore, AppError> {
    let pool = connect_with_retry(config).await?;
    run_migrations(&pool, &config.migrations_dir).await?;

    Ok(PostgresStore::new(pool))
}

/// Delete expired sessions every `period`
///
/// A failed sweep is logged and retried on the next tick.
pub async fn sweep_expired_sessions<Store>(store: Store, period: Duration)
where
    Store: ExpiredDeletion,
{
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        match store.delete_expired().await {
            Ok(()) => {
                SESSION_SWEEPS_TOTAL.with_label_values(&["ok"]).inc();
                tracing::debug!("Expired sessions removed");
            }
            Err(error) => {
                SESSION_SWEEPS_TOTAL.with_label_values(&["failed"]).inc();
                tracing::error!(%error, "Session cleanup failed");
            }
        }
    }
}
