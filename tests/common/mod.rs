//! In-process inventory backend used by the integration tests.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use rest_mcp_adapter::types::{BackendConfig, Config};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct Inventory {
    products: Arc<Mutex<BTreeMap<String, Value>>>,
    pub flaky_calls: Arc<AtomicUsize>,
    /// Number of 503s `/flaky` answers before succeeding.
    pub flaky_failures: usize,
}

impl Inventory {
    pub fn seeded() -> Self {
        let inventory = Self {
            flaky_failures: 2,
            ..Self::default()
        };
        {
            let mut products = inventory.products.lock().unwrap();
            products.insert(
                "prod-1".into(),
                json!({"id": "prod-1", "name": "Widget A", "quantity": 100, "status": "available"}),
            );
            products.insert(
                "prod-2".into(),
                json!({"id": "prod-2", "name": "Widget B", "quantity": 50, "status": "discontinued"}),
            );
        }
        inventory
    }

    pub fn with_flaky_failures(mut self, failures: usize) -> Self {
        self.flaky_failures = failures;
        self
    }

    pub fn product(&self, id: &str) -> Option<Value> {
        self.products.lock().unwrap().get(id).cloned()
    }
}

pub fn inventory_document() -> Value {
    json!({
        "openapi": "3.0.2",
        "info": {"title": "Inventory Service", "version": "1.0.0"},
        "paths": {
            "/products": {
                "get": {
                    "operationId": "listProducts",
                    "summary": "List products",
                    "parameters": [
                        {"name": "limit", "in": "query", "required": false,
                         "schema": {"type": "integer", "default": 10, "enum": [5, 10, 20]}},
                        {"name": "status", "in": "query", "required": false,
                         "schema": {"type": "string"}}
                    ]
                },
                "post": {
                    "operationId": "createProduct",
                    "summary": "Create product",
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/ProductCreate"}
                        }}
                    }
                }
            },
            "/products/{product_id}": {
                "get": {
                    "operationId": "getProduct",
                    "summary": "Get product",
                    "description": "Fetch a single product by id",
                    "parameters": [{"name": "product_id", "in": "path", "required": true,
                                    "schema": {"type": "string"}}]
                },
                "put": {
                    "summary": "Replace product",
                    "parameters": [{"name": "product_id", "in": "path", "required": true,
                                    "schema": {"type": "string"}}],
                    "requestBody": {"content": {"application/json": {
                        "schema": {"$ref": "#/components/schemas/ProductCreate"}
                    }}}
                },
                "delete": {
                    "operationId": "deleteProduct",
                    "parameters": [{"name": "product_id", "in": "path", "required": true}]
                }
            },
            "/products/{product_id}/tags": {
                "post": {
                    "operationId": "tagProduct",
                    "parameters": [{"name": "product_id", "in": "path", "required": true}],
                    "requestBody": {"content": {"application/json": {
                        "schema": {"type": "array", "items": {"type": "string"}}
                    }}}
                }
            },
            "/whoami": {
                "get": {
                    "operationId": "whoami",
                    "parameters": [{"name": "X-Tenant", "in": "header", "required": true,
                                    "schema": {"type": "string"}}]
                }
            },
            "/flaky": {"get": {"operationId": "flaky"}}
        },
        "components": {
            "schemas": {
                "ProductCreate": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "name": {"type": "string"},
                        "quantity": {"type": "integer"}
                    },
                    "required": ["id", "name"]
                }
            }
        }
    })
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "inventory-api"}))
}

async fn openapi() -> Json<Value> {
    Json(inventory_document())
}

async fn list_products(
    State(inventory): State<Inventory>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(10);
    let products: Vec<Value> = inventory
        .products
        .lock()
        .unwrap()
        .values()
        .filter(|p| params.get("status").map_or(true, |s| p["status"] == json!(s)))
        .take(limit)
        .cloned()
        .collect();
    Json(Value::Array(products))
}

async fn create_product(
    State(inventory): State<Inventory>,
    Json(product): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let Some(id) = product["id"].as_str().map(str::to_string) else {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": "id required"})));
    };
    inventory.products.lock().unwrap().insert(id, product.clone());
    (StatusCode::CREATED, Json(product))
}

async fn get_product(
    State(inventory): State<Inventory>,
    Path(product_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match inventory.product(&product_id) {
        Some(product) => (StatusCode::OK, Json(product)),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Product not found"}))),
    }
}

async fn replace_product(
    State(inventory): State<Inventory>,
    Path(product_id): Path<String>,
    Json(product): Json<Value>,
) -> Json<Value> {
    inventory
        .products
        .lock()
        .unwrap()
        .insert(product_id, product.clone());
    Json(product)
}

async fn delete_product(
    State(inventory): State<Inventory>,
    Path(product_id): Path<String>,
) -> StatusCode {
    match inventory.products.lock().unwrap().remove(&product_id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn tag_product(Path(product_id): Path<String>, Json(tags): Json<Vec<String>>) -> Json<Value> {
    Json(json!({"id": product_id, "tags": tags}))
}

async fn whoami(headers: HeaderMap) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "tenant": header("x-tenant"),
        "authorization": header("authorization"),
    }))
}

async fn flaky(State(inventory): State<Inventory>) -> (StatusCode, Json<Value>) {
    let call = inventory.flaky_calls.fetch_add(1, Ordering::SeqCst);
    if call < inventory.flaky_failures {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"detail": "warming up"})))
    } else {
        (StatusCode::OK, Json(json!({"ok": true, "attempt": call + 1})))
    }
}

pub fn router(inventory: Inventory) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/openapi.json", get(openapi))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{product_id}",
            get(get_product).put(replace_product).delete(delete_product),
        )
        .route("/products/{product_id}/tags", axum::routing::post(tag_product))
        .route("/whoami", get(whoami))
        .route("/flaky", get(flaky))
        .with_state(inventory)
}

/// Serve the inventory backend on an ephemeral port.
pub async fn spawn_inventory(inventory: Inventory) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(inventory)).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Adapter config with a live `inventory` backend and an unreachable `billing`.
pub fn adapter_config(inventory: SocketAddr, billing: SocketAddr) -> Config {
    let mut config = Config::default();
    config.services.clear();
    config.services.insert(
        "inventory".into(),
        BackendConfig::new(format!("http://{}", inventory))
            .with_retries(3)
            .with_timeout(Duration::from_secs(5))
            .with_auth_token("secret-token"),
    );
    config.services.insert(
        "billing".into(),
        BackendConfig::new(format!("http://{}", billing))
            .with_retries(0)
            .with_timeout(Duration::from_secs(1)),
    );
    config.retry.backoff_base = Duration::from_millis(10);
    config
}
