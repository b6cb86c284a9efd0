//! In-process stand-in for the shop backend.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

pub const PRODUCT_PRICE: f64 = 20_000_000.0;
pub const VARIANT_PRICE: f64 = 23_000_000.0;
/// Card rate quoted when the request carries none, percent per month.
pub const CARD_RATE: f64 = 1.5;

#[derive(Debug, Default)]
pub struct Recorded {
    pub uploads: Vec<String>,
    pub calculations: Vec<Value>,
    pub orders: Vec<Value>,
    /// `Authorization` header of every upload, calculation and order call.
    pub auth_headers: Vec<Option<String>>,
    pub fail_orders: bool,
    pub reject_calculations: bool,
}

type Shared = Arc<Mutex<Recorded>>;

pub struct MockBackend {
    pub api_url: String,
    state: Shared,
}

impl MockBackend {
    /// Serve the mock on an ephemeral localhost port.
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/api/products/:id", get(product))
            .route("/api/upload", post(upload))
            .route("/api/installment/calculate", post(calculate))
            .route("/api/orders", post(create_order))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api_url: format!("http://{addr}/api"),
            state,
        }
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.state.lock().unwrap()
    }

    pub fn fail_orders(&self) {
        self.recorded().fail_orders = true;
    }

    pub fn reject_calculations(&self) {
        self.recorded().reject_calculations = true;
    }
}

fn auth(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn product(Path(id): Path<String>) -> Response {
    if id != "p1" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Product not found" })),
        )
            .into_response();
    }
    Json(json!({
        "product": {
            "_id": "p1",
            "name": "Phone X",
            "price": PRODUCT_PRICE,
            "images": ["/uploads/phone-x.jpg"],
            "variants": [{ "_id": "v1", "name": "256GB", "price": VARIANT_PRICE, "stock": 3 }]
        }
    }))
    .into_response()
}

async fn upload(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut urls = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("images") {
            continue;
        }
        let name = field.file_name().unwrap_or("file").to_string();
        let _ = field.bytes().await;
        urls.push(format!("/uploads/{name}"));
    }

    let mut recorded = state.lock().unwrap();
    recorded.auth_headers.push(auth(&headers));
    recorded.uploads.extend(urls.iter().cloned());
    Json(json!({ "urls": urls })).into_response()
}

async fn calculate(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut recorded = state.lock().unwrap();
    recorded.auth_headers.push(auth(&headers));
    recorded.calculations.push(body.clone());

    if recorded.reject_calculations {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Term not offered for this product" })),
        )
            .into_response();
    }

    let price = match body["variantId"].as_str() {
        Some("v1") => VARIANT_PRICE,
        _ => PRODUCT_PRICE,
    };
    let upfront = body["upfront"].as_f64().unwrap_or_default();
    let months = body["months"].as_f64().unwrap_or(12.0);
    let rate = body["interestRate"].as_f64().unwrap_or(CARD_RATE);

    if upfront > price {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Down payment exceeds price" })),
        )
            .into_response();
    }

    let financed = price - upfront;
    let repaid = (financed + financed * rate / 100.0 * months).round();
    Json(json!({
        "success": true,
        "monthlyPayment": (repaid / months).round(),
        "totalPayment": upfront + repaid,
        "upfront": upfront,
        "months": months as u32,
        "interestRate": rate,
        "detail": format!("{months} monthly payments"),
    }))
    .into_response()
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut recorded = state.lock().unwrap();
    recorded.auth_headers.push(auth(&headers));
    if recorded.fail_orders {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Order service unavailable" })),
        )
            .into_response();
    }

    recorded.orders.push(body.clone());
    let id = format!("ord-{}", recorded.orders.len());
    Json(json!({
        "order": {
            "_id": id,
            "status": "pending",
            "installment": body["installment"].clone(),
        }
    }))
    .into_response()
}
