use std::net::SocketAddr;
use std::sync::Arc;

use islandboard_api::background::auto_refresh;
use islandboard_api::config::{DashboardConfig, ServerConfig};
use islandboard_api::router::build_app_router;
use islandboard_api::state::AppState;
use islandboard_db::{EntryStore, MemoryStore, PgStore};
use islandboard_live::{LiveConfig, LiveUpdateChannel};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "islandboard_api=debug,islandboard_live=info,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    let dashboard = DashboardConfig::from_env().expect("Invalid dashboard configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        api_base_url = %dashboard.api_base_url,
        ws_url = %dashboard.ws_url,
        mock_data_enabled = dashboard.mock_data_enabled,
        "Loaded configuration",
    );

    // --- Store ---
    let store: Arc<dyn EntryStore> = match &dashboard.database_url {
        Some(url) => {
            let pool = islandboard_db::create_pool(url)
                .await
                .expect("Failed to connect to database");
            islandboard_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            islandboard_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Using PostgreSQL store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, entries are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Session state ---
    let state = AppState::new(config.clone(), dashboard.clone(), store)
        .expect("Failed to build scraper client");

    match state.queue.load().await {
        Ok(count) => tracing::info!(count, "Approval queue loaded"),
        Err(e) => tracing::warn!(error = %e, "Failed to load approval queue"),
    }
    let report = state.refresher.refresh().await;
    tracing::info!(
        backend_available = report.backend_available,
        mock_islands = report.mock_islands,
        "Initial island view assembled",
    );

    // --- Live updates ---
    let live = LiveUpdateChannel::start(
        LiveConfig::new(dashboard.ws_url.clone()).with_reconnect_delay(dashboard.reconnect_delay),
        Arc::clone(&state.assembler),
        Arc::clone(&state.event_bus),
    );
    let state = state.with_live(Arc::clone(&live));

    // --- Auto refresh ---
    let cancel = CancellationToken::new();
    let refresh_handle = dashboard.auto_refresh_interval.map(|period| {
        tokio::spawn(auto_refresh::run(
            Arc::clone(&state.refresher),
            period,
            cancel.clone(),
        ))
    });
    if refresh_handle.is_none() {
        tracing::info!("Auto refresh disabled");
    }

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let timeout = config.shutdown_timeout();

    cancel.cancel();
    if let Some(handle) = refresh_handle {
        if tokio::time::timeout(timeout, handle).await.is_err() {
            tracing::warn!("Auto refresh did not stop in time");
        }
    }

    if let Err(e) = live.shutdown(timeout).await {
        tracing::warn!(error = %e, "Live update channel shutdown incomplete");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
