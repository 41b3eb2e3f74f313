use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ipguard_api::config::{load_ip_restriction_settings, ServerConfig};
use ipguard_api::guard::{AccessGuard, GeoProvider, HttpGeoProvider, NoopGeoProvider};
use ipguard_api::router::build_app_router;
use ipguard_api::state::AppState;
use ipguard_api::background;
use ipguard_db::store::{AccessStore, PgAccessStore};
use ipguard_events::{DeliveryWorker, EventBus};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ipguard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let settings = load_ip_restriction_settings();
    tracing::info!(
        enabled = settings.enabled,
        default_max_concurrent_ips = settings.default_max_concurrent_ips,
        geo_restriction_enabled = settings.geo_restriction_enabled,
        "Loaded IP restriction settings"
    );
    let geo_enabled = settings.geo_restriction_enabled;
    let settings = Arc::new(RwLock::new(settings));

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = ipguard_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    ipguard_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    ipguard_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn AccessStore> = Arc::new(PgAccessStore::new(pool));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    tracing::info!("Event bus created");

    // Spawn webhook delivery when a sink is configured.
    let delivery_handle = config.event_webhook_url.clone().map(|url| {
        tracing::info!(url = %url, "Event webhook delivery enabled");
        tokio::spawn(DeliveryWorker::run(url, event_bus.subscribe()))
    });

    // --- Guard ---
    let geo_provider: Arc<dyn GeoProvider> = if geo_enabled {
        Arc::new(HttpGeoProvider::new(config.geo_provider_url.clone()))
    } else {
        Arc::new(NoopGeoProvider)
    };
    let guard = Arc::new(AccessGuard::new(
        Arc::clone(&store),
        Arc::clone(&settings),
        Arc::clone(&event_bus),
        geo_provider,
    ));

    // --- Maintenance sweep ---
    let cleanup_cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(background::cleanup::run(
        Arc::clone(&store),
        Arc::clone(&settings),
        cleanup_cancel.clone(),
    ));
    tracing::info!("Maintenance sweep started");

    // --- App state ---
    let state = AppState {
        store,
        settings,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        guard,
    };

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

    cleanup_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await;
    tracing::info!("Maintenance sweep stopped");

    // Drop the event bus sender to close the broadcast channel. This
    // signals the delivery worker to shut down.
    drop(event_bus);
    if let Some(handle) = delivery_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    tracing::info!("Event services shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
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
