//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::config::Config;
use api::{AppState, LocalCollaborators};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cache::InMemoryCache;
use common::{OrderId, ProductId, StoreId, UserId};
use domain::{CartItem, Money, SalesReport, ShippingAddress};
use fulfillment::Stores;
use fulfillment::services::{GatewayStatus, Product, Template, UserProfile};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{
    InMemoryOrderStore, InMemoryPaymentStore, InMemorySalesReportStore, InMemorySellerOrderStore,
};
use tower::ServiceExt;

const BUYER: &str = "buyer@example.com";
const SELLER_A: &str = "seller-a@example.com";
const SELLER_B: &str = "seller-b@example.com";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    state: Arc<AppState>,
    local: LocalCollaborators,
    seller_orders: InMemorySellerOrderStore,
}

fn cart_line(id: &str, store: &str, quantity: u32, cents: i64) -> CartItem {
    CartItem {
        product_id: ProductId::new(id),
        product_name: id.to_uppercase(),
        product_image: vec![],
        store_id: StoreId::new(store),
        quantity,
        price: Money::from_cents(cents),
        selected: true,
    }
}

fn product(id: &str, store: &str, cents: i64, stock: i64) -> Product {
    Product {
        product_id: ProductId::new(id),
        name: id.to_uppercase(),
        price: Money::from_cents(cents),
        stock,
        store_id: StoreId::new(store),
        images: vec![],
    }
}

fn profile(user: &str, address: Option<ShippingAddress>) -> UserProfile {
    UserProfile {
        user: UserId::new(user),
        name: user.to_string(),
        address,
    }
}

async fn setup() -> TestApp {
    let local = LocalCollaborators::new();
    let seller_orders = InMemorySellerOrderStore::new();
    let stores = Stores {
        orders: Arc::new(InMemoryOrderStore::new()),
        seller_orders: Arc::new(seller_orders.clone()),
        payments: Arc::new(InMemoryPaymentStore::new()),
        sales_reports: Arc::new(InMemorySalesReportStore::new()),
    };

    local
        .identity
        .add_buyer(profile(
            BUYER,
            Some(ShippingAddress {
                recipient: "Buyer".into(),
                phone: "555-0100".into(),
                street: "1 Main St".into(),
                city: "Springfield".into(),
                province: "IL".into(),
                postal_code: "62701".into(),
            }),
        ))
        .await;
    local
        .identity
        .add_seller(profile(SELLER_A, None), &[StoreId::new("A")])
        .await;
    local
        .identity
        .add_seller(profile(SELLER_B, None), &[StoreId::new("B")])
        .await;

    local.catalog.add_product(product("p1", "A", 1000, 3)).await;
    local.catalog.add_product(product("p2", "B", 500, 10)).await;
    local
        .cart
        .put_cart(
            &UserId::new(BUYER),
            vec![cart_line("p1", "A", 2, 1000), cart_line("p2", "B", 1, 500)],
        )
        .await;

    stores
        .sales_reports
        .insert(&SalesReport::empty(StoreId::new("A"), UserId::new(SELLER_A)))
        .await
        .unwrap();
    stores
        .sales_reports
        .insert(&SalesReport::empty(StoreId::new("B"), UserId::new(SELLER_B)))
        .await
        .unwrap();

    let (state, _worker) = api::create_state(
        stores,
        Arc::new(InMemoryCache::new()),
        &local,
        &Config::default(),
    );
    let app = api::create_app(state.clone(), get_metrics_handle());
    TestApp {
        app,
        state,
        local,
        seller_orders,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header("x-user-email", user);
        }
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    async fn create_order(&self) -> String {
        let (status, json) = self.send("POST", "/orders", Some(BUYER), None).await;
        assert_eq!(status, StatusCode::CREATED);
        json["order_id"].as_str().unwrap().to_string()
    }

    async fn pay(&self, order_id: &str) {
        self.local
            .gateway
            .set_status(OrderId::parse(order_id).unwrap(), GatewayStatus::Settlement)
            .await;
        let (status, json) = self
            .send(
                "POST",
                "/payments/notifications",
                None,
                Some(serde_json::json!({ "order_id": order_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["paid"], true);
    }

    async fn seller_item_status(&self, order_id: &str, product: &str) -> serde_json::Value {
        let (_, order) = self
            .send("GET", &format!("/seller/orders/{order_id}"), Some(SELLER_A), None)
            .await;
        order["items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["product_id"] == product)
            .map(|i| i["order_status"].clone())
            .unwrap_or(serde_json::Value::Null)
    }

    async fn item_status(&self, order_id: &str, product: &str) -> serde_json::Value {
        let (_, order) = self
            .send("GET", &format!("/orders/{order_id}"), Some(BUYER), None)
            .await;
        order["items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["product_id"] == product)
            .map(|i| i["order_status"].clone())
            .unwrap_or(serde_json::Value::Null)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;

    let (status, json) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = setup().await;

    let (status, json) = app.send("GET", "/orders", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("x-user-email"));
}

#[tokio::test]
async fn test_create_and_read_order() {
    let app = setup().await;
    let order_id = app.create_order().await;

    let (status, order) = app
        .send("GET", &format!("/orders/{order_id}"), Some(BUYER), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["order_id"], order_id);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["payment"]["status"], "PENDING");

    let (status, list) = app.send("GET", "/orders", Some(BUYER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, seller_order) = app
        .send(
            "GET",
            &format!("/seller/orders/{order_id}"),
            Some(SELLER_A),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seller_order["store_id"], "A");
    assert_eq!(seller_order["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_buyer_sees_not_found() {
    let app = setup().await;
    let order_id = app.create_order().await;

    let (status, _) = app
        .send(
            "GET",
            &format!("/orders/{order_id}"),
            Some("stranger@example.com"),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_order_id_is_bad_request() {
    let app = setup().await;

    let (status, _) = app
        .send("GET", "/orders/not-a-uuid", Some(BUYER), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_order_with_empty_cart() {
    let app = setup().await;
    app.local.cart.put_cart(&UserId::new(BUYER), vec![]).await;

    let (status, json) = app.send("POST", "/orders", Some(BUYER), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_initialize_payment_returns_redirect() {
    let app = setup().await;
    let order_id = app.create_order().await;
    let uri = format!("/orders/{order_id}/payment");

    let (status, first) = app.send("POST", &uri, Some(BUYER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(first["redirect_url"].as_str().unwrap().contains(&order_id));

    let (_, second) = app.send("POST", &uri, Some(BUYER), None).await;
    assert_eq!(first, second);
    assert_eq!(app.local.gateway.session_count().await, 1);
}

#[tokio::test]
async fn test_webhook_requires_order_id() {
    let app = setup().await;

    let (status, _) = app
        .send(
            "POST",
            "/payments/notifications",
            None,
            Some(serde_json::json!({ "transaction_status": "settlement" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_for_unpaid_order() {
    let app = setup().await;
    let order_id = app.create_order().await;
    app.send("POST", &format!("/orders/{order_id}/payment"), Some(BUYER), None)
        .await;

    let (status, json) = app
        .send(
            "POST",
            "/payments/notifications",
            None,
            Some(serde_json::json!({ "order_id": order_id })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paid"], false);
    assert_eq!(app.item_status(&order_id, "p1").await, "PENDING");
}

#[tokio::test]
async fn test_webhook_gateway_failure_asks_for_redelivery() {
    let app = setup().await;
    let order_id = app.create_order().await;
    app.local.gateway.set_fail(true);

    let (status, _) = app
        .send(
            "POST",
            "/payments/notifications",
            None,
            Some(serde_json::json!({ "order_id": order_id })),
        )
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_paid_order_notifies_buyer_live() {
    let app = setup().await;
    let mut live = app.local.hub.subscribe(&UserId::new(BUYER)).await;
    let order_id = app.create_order().await;
    app.send("POST", &format!("/orders/{order_id}/payment"), Some(BUYER), None)
        .await;

    app.pay(&order_id).await;

    assert_eq!(app.item_status(&order_id, "p1").await, "PROCESSED");
    let mut templates = Vec::new();
    while let Ok(Some(message)) = tokio::time::timeout(Duration::from_secs(1), live.recv()).await
    {
        templates.push(message.template);
        if message.template == Template::UserPayment {
            break;
        }
    }
    assert!(templates.contains(&Template::UserOrder));
    assert!(templates.contains(&Template::UserPayment));
}

#[tokio::test]
async fn test_ship_finish_and_sales_report() {
    let app = setup().await;
    let order_id = app.create_order().await;
    app.send("POST", &format!("/orders/{order_id}/payment"), Some(BUYER), None)
        .await;
    app.pay(&order_id).await;

    let item_uri = format!("/orders/{order_id}/items/p1");
    let seller_item_uri = format!("/seller/orders/{order_id}/items/p1");

    // Receipt cannot be confirmed before the seller ships.
    let (status, json) = app
        .send(
            "PATCH",
            &item_uri,
            Some(BUYER),
            Some(serde_json::json!({ "status": "FINISHED" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("PROCESSED"));

    let (status, _) = app
        .send(
            "PATCH",
            &seller_item_uri,
            Some(SELLER_A),
            Some(serde_json::json!({ "status": "SHIPPED" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.item_status(&order_id, "p1").await, "SHIPPED");
    assert_eq!(
        app.local.catalog.stock(&ProductId::new("p1")).await,
        Some(1)
    );

    let (status, _) = app
        .send(
            "PATCH",
            &item_uri,
            Some(BUYER),
            Some(serde_json::json!({ "status": "FINISHED" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.item_status(&order_id, "p1").await, "FINISHED");

    let (status, report) = app
        .send("GET", "/seller/stores/A/sales-report", Some(SELLER_A), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_sold"], 2);
    assert_eq!(report["products"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send("GET", "/seller/stores/A/sales-report", Some(SELLER_B), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_seller_cannot_ship_unpaid_or_set_other_status() {
    let app = setup().await;
    let order_id = app.create_order().await;
    let uri = format!("/seller/orders/{order_id}/items/p1");

    let (status, _) = app
        .send(
            "PATCH",
            &uri,
            Some(SELLER_A),
            Some(serde_json::json!({ "status": "SHIPPED" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "PATCH",
            &uri,
            Some(SELLER_A),
            Some(serde_json::json!({ "status": "FINISHED" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_buyer_cancels_pending_item() {
    let app = setup().await;
    let order_id = app.create_order().await;

    let (status, _) = app
        .send(
            "DELETE",
            &format!("/orders/{order_id}/items/p2"),
            Some(BUYER),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, order) = app
        .send("GET", &format!("/orders/{order_id}"), Some(BUYER), None)
        .await;
    assert_eq!(order["items"].as_array().unwrap().len(), 1);

    let (_, seller_order) = app
        .send(
            "GET",
            &format!("/seller/orders/{order_id}"),
            Some(SELLER_B),
            None,
        )
        .await;
    assert_eq!(seller_order["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_seller_cannot_cancel_processed_item() {
    let app = setup().await;
    let order_id = app.create_order().await;
    app.send("POST", &format!("/orders/{order_id}/payment"), Some(BUYER), None)
        .await;
    app.pay(&order_id).await;

    let (status, _) = app
        .send(
            "DELETE",
            &format!("/seller/orders/{order_id}/items/p1"),
            Some(SELLER_A),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.item_status(&order_id, "p1").await, "PROCESSED");
}

#[tokio::test]
async fn test_repair_endpoint_on_consistent_order() {
    let app = setup().await;
    let order_id = app.create_order().await;

    let (status, report) = app
        .send("POST", &format!("/admin/orders/{order_id}/repair"), None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["order_id"], order_id);
    assert!(report["actions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_repair_unknown_order() {
    let app = setup().await;

    let (status, _) = app
        .send(
            "POST",
            &format!("/admin/orders/{}/repair", OrderId::new()),
            None,
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_repair_sweep_endpoint() {
    let app = setup().await;
    app.create_order().await;

    let (status, summary) = app.send("POST", "/admin/repair", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["scanned"], 1);
    assert_eq!(summary["failed"], 0);
    assert!(summary["repaired"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_background_sweep_completes_interrupted_payment() {
    let app = setup().await;
    let order_id = app.create_order().await;
    app.send("POST", &format!("/orders/{order_id}/payment"), Some(BUYER), None)
        .await;
    app.local
        .gateway
        .set_status(OrderId::parse(&order_id).unwrap(), GatewayStatus::Settlement)
        .await;

    app.seller_orders.fail_writes();
    let (status, _) = app
        .send(
            "POST",
            "/payments/notifications",
            None,
            Some(serde_json::json!({ "order_id": order_id })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    app.seller_orders.clear_faults();
    assert_eq!(app.seller_item_status(&order_id, "p1").await, "PENDING");

    let sweep = api::spawn_repair_sweep(&app.state, Duration::from_millis(20));
    let mut status = app.seller_item_status(&order_id, "p1").await;
    for _ in 0..100 {
        if status == "PROCESSED" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        status = app.seller_item_status(&order_id, "p1").await;
    }
    sweep.abort();

    assert_eq!(status, "PROCESSED");
    assert_eq!(app.item_status(&order_id, "p1").await, "PROCESSED");
}

#[tokio::test]
async fn test_repair_sweep_stops_with_state() {
    let TestApp { app, state, .. } = setup().await;
    let sweep = api::spawn_repair_sweep(&state, Duration::from_millis(10));
    drop(app);
    drop(state);

    tokio::time::timeout(Duration::from_secs(2), sweep)
        .await
        .expect("sweep kept running after state was dropped")
        .unwrap();
}
