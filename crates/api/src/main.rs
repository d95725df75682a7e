//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::{Config, LogFormat};
use cache::{Cache, InMemoryCache, RedisCache};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const OUTBOX_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Document stores
    let stores = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            store::run_migrations(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL stores");
            api::postgres_stores(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            api::in_memory_stores()
        }
    };

    // 4. Cache
    let cache: Arc<dyn Cache> = match &config.redis_url {
        Some(url) => {
            let redis = RedisCache::connect(url)
                .await
                .expect("failed to connect to Redis");
            tracing::info!("using Redis cache");
            Arc::new(redis)
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory cache");
            Arc::new(InMemoryCache::new())
        }
    };

    // 5. Orchestrator, outbox worker and router
    let local = api::LocalCollaborators::new();
    let (state, outbox_worker) = api::create_state(stores, cache, &local, &config);
    match config.repair_interval() {
        Some(every) => {
            tracing::info!(interval_secs = every.as_secs(), "starting repair sweep");
            api::spawn_repair_sweep(&state, every);
        }
        None => tracing::warn!("REPAIR_INTERVAL_SECS is 0, repair sweep disabled"),
    }
    let app = api::create_app(state, metrics_handle);

    // 6. Serve
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. The router is gone, so the outbox closes once its queue drains.
    match tokio::time::timeout(OUTBOX_SHUTDOWN_GRACE, outbox_worker).await {
        Ok(_) => tracing::info!("notification outbox drained"),
        Err(_) => tracing::warn!("notification outbox did not drain in time"),
    }

    tracing::info!("server shut down gracefully");
}
