//! HTTP API for order fulfillment and payment reconciliation.
//!
//! Exposes buyer, seller, webhook and operator endpoints over the
//! [`OrderOrchestrator`], with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::Router;
use axum::routing::{get, patch, post};
use cache::Cache;
use fulfillment::services::{
    InMemoryCartService, InMemoryCatalogService, InMemoryIdentityService,
    InMemoryNotificationSink, InMemoryPaymentGateway, InMemoryReviewService,
};
use fulfillment::{Collaborators, NotificationHub, OrderOrchestrator, Outbox, Stores};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use store::{
    InMemoryOrderStore, InMemoryPaymentStore, InMemorySalesReportStore, InMemorySellerOrderStore,
    PostgresOrderStore, PostgresPaymentStore, PostgresSalesReportStore, PostgresSellerOrderStore,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create).get(routes::orders::list),
        )
        .route("/orders/{order_id}", get(routes::orders::get))
        .route(
            "/orders/{order_id}/items/{product_id}",
            patch(routes::orders::update_item).delete(routes::orders::cancel_item),
        )
        .route(
            "/orders/{order_id}/payment",
            post(routes::orders::initialize_payment),
        )
        .route("/payments/notifications", post(routes::payments::notify))
        .route("/seller/orders", get(routes::seller::list))
        .route("/seller/orders/{order_id}", get(routes::seller::get))
        .route(
            "/seller/orders/{order_id}/items/{product_id}",
            patch(routes::seller::update_item).delete(routes::seller::cancel_item),
        )
        .route(
            "/seller/stores/{store_id}/sales-report",
            get(routes::seller::sales_report),
        )
        .route("/admin/repair", post(routes::admin::repair_all))
        .route(
            "/admin/orders/{order_id}/repair",
            post(routes::admin::repair_order),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// In-process collaborators used when no external services are wired in.
///
/// Handles are clones of what the orchestrator holds, so callers can seed
/// carts, products and users, or subscribe to the live-update hub.
#[derive(Clone)]
pub struct LocalCollaborators {
    pub cart: InMemoryCartService,
    pub catalog: InMemoryCatalogService,
    pub reviews: InMemoryReviewService,
    pub identity: InMemoryIdentityService,
    pub gateway: InMemoryPaymentGateway,
    pub sink: InMemoryNotificationSink,
    pub hub: NotificationHub,
}

impl LocalCollaborators {
    pub fn new() -> Self {
        let hub = NotificationHub::default();
        Self {
            cart: InMemoryCartService::new(),
            catalog: InMemoryCatalogService::new(),
            reviews: InMemoryReviewService::new(),
            identity: InMemoryIdentityService::new(),
            gateway: InMemoryPaymentGateway::new(),
            sink: InMemoryNotificationSink::with_hub(hub.clone()),
            hub,
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            cart: Arc::new(self.cart.clone()),
            catalog: Arc::new(self.catalog.clone()),
            reviews: Arc::new(self.reviews.clone()),
            identity: Arc::new(self.identity.clone()),
            gateway: Arc::new(self.gateway.clone()),
        }
    }
}

impl Default for LocalCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

/// Document stores backed by process memory.
pub fn in_memory_stores() -> Stores {
    Stores {
        orders: Arc::new(InMemoryOrderStore::new()),
        seller_orders: Arc::new(InMemorySellerOrderStore::new()),
        payments: Arc::new(InMemoryPaymentStore::new()),
        sales_reports: Arc::new(InMemorySalesReportStore::new()),
    }
}

/// Document stores backed by PostgreSQL. Migrations must already be applied.
pub fn postgres_stores(pool: PgPool) -> Stores {
    Stores {
        orders: Arc::new(PostgresOrderStore::new(pool.clone())),
        seller_orders: Arc::new(PostgresSellerOrderStore::new(pool.clone())),
        payments: Arc::new(PostgresPaymentStore::new(pool.clone())),
        sales_reports: Arc::new(PostgresSalesReportStore::new(pool)),
    }
}

/// Builds the application state and starts the notification worker.
///
/// The worker exits once the returned state, and every router holding it,
/// has been dropped.
pub fn create_state(
    stores: Stores,
    cache: Arc<dyn Cache>,
    local: &LocalCollaborators,
    config: &Config,
) -> (Arc<AppState>, JoinHandle<()>) {
    let (outbox, worker) = Outbox::spawn(
        config.notification_queue_capacity,
        Arc::new(local.sink.clone()),
        config.notification_timeout(),
    );

    let orchestrator = OrderOrchestrator::new(
        stores,
        local.collaborators(),
        cache,
        outbox,
        config.orchestrator(),
    );

    (Arc::new(AppState { orchestrator }), worker)
}

/// Runs the repair sweep every `every`, starting immediately.
///
/// Holds only a weak reference, so the task ends once the state is dropped
/// and never keeps the notification outbox open at shutdown.
pub fn spawn_repair_sweep(state: &Arc<AppState>, every: Duration) -> JoinHandle<()> {
    let state: Weak<AppState> = Arc::downgrade(state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(state) = state.upgrade() else {
                tracing::debug!("application state dropped, repair sweep stopped");
                return;
            };
            if let Err(e) = state.orchestrator.repair_all().await {
                tracing::warn!(error = %e, "repair sweep failed");
            }
        }
    })
}
