//! Data layer module
//!
//! Handles all data persistence:
//! - PostgreSQL bootstrap and migrations
//! - Session store (PostgreSQL, or in-memory for tests and local runs)

mod database;
mod sessions;

pub use database::{
    connect_options, connect_with_retry, discover_migrations, retry_with_fixed_delay,
    run_migrations,
};
pub use sessions::{connect_session_store, sweep_expired_sessions};
pub use tower_sessions::MemoryStore;
pub use tower_sessions_sqlx_store::PostgresStore;
