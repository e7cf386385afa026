//! github-oauth-backend binary entry point

use github_oauth_backend::{AppState, config, data};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Connect the session store (database, migrations) and build AppState
/// 4. Build Axum router
/// 5. Start background tasks (session cleanup)
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    init_tracing(&config.logging);
    tracing::info!("Starting github-oauth-backend...");

    github_oauth_backend::metrics::init_metrics();

    tracing::info!(
        environment = ?config.server.environment,
        frontend_url = %config.server.frontend_url,
        cookie_secure = config.session.cookie_secure,
        "Configuration loaded"
    );
    if !config.session.cookie_secure {
        tracing::warn!("Session cookie is sent without the Secure attribute");
    }

    // 3. Initialize session store and application state
    let store = data::connect_session_store(&config.database).await?;
    let state = AppState::new(config.clone())?;

    // 4. Build Axum router
    let app = github_oauth_backend::build_router(state.clone(), store.clone());

    // 5. Start background tasks
    spawn_session_cleanup_task(store, state.sessions.cleanup_interval());

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(logging: &config::LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("github_oauth_backend={},tower_http=debug", logging.level).into()
    });

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Spawn background expired-session sweep
fn spawn_session_cleanup_task(store: data::PostgresStore, period: std::time::Duration) {
    tokio::spawn(data::sweep_expired_sessions(store, period));

    tracing::info!(interval_secs = period.as_secs(), "Session cleanup task spawned");
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
