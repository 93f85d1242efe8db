#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthGate, AuthOutcome, SESSION_COOKIE};
use crate::bom::{Material, Product, scale_materials, validate_input_weight};
use crate::config::Config;
use crate::dates::{korean_timestamp, korean_timestamp_padded};
use crate::record::{
    DefectCheckData, ProductionData, flatten_defect_data, flatten_production_data,
    validate_production_data,
};
use crate::refdata::{self, RefData, SerialLot};
use crate::store::FileStore;

pub struct AppState {
    pub refdata: RefData,
    pub auth: AuthGate,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
        let bom_book = Arc::new(FileStore::new(&config.bom_book_dir)?);
        let storage_book = Arc::new(FileStore::new(&config.storage_book_dir)?);

        Ok(AppState {
            refdata: RefData::new(bom_book, storage_book, config.fallback_password.clone()),
            auth: AuthGate::in_memory(config.session_key, config.session_ttl_secs),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalculateRequest {
    product_code: String,
    product_name: String,
    base_quantity: f64,
    materials: Vec<Material>,
    input_weight: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculateResponse {
    product_code: String,
    product_name: String,
    input_weight: f64,
    materials: Vec<Material>,
}

#[derive(Deserialize)]
struct PasswordRequest {
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackagingQuery {
    product_code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotQuery {
    packaging_code: Option<String>,
}

// The production app's serial-lot wire shape differs from the defect
// app's: it exposes the lot number under "serialLot".
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SerialLotEntry {
    code: String,
    serial_lot: String,
    stock_quantity: String,
}

impl From<SerialLot> for SerialLotEntry {
    fn from(lot: SerialLot) -> Self {
        SerialLotEntry {
            code: lot.code,
            serial_lot: lot.lot_number,
            stock_quantity: lot.stock_quantity,
        }
    }
}

pub async fn run_production(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(&config)?);
    let app = production_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    log::info!("production log listening on http://{}", config.bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

pub async fn run_defect(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(&config)?);
    let app = defect_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    log::info!("defect check log listening on http://{}", config.bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

pub fn production_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/products", get(list_products))
        .route("/api/materials", get(list_materials))
        .route("/api/authors", get(list_people))
        .route("/api/serial-lot", get(list_serial_lots))
        .route("/api/serial-lot-info", get(serial_lot_info))
        .route("/api/calculate", post(calculate))
        .route("/api/save", post(save_production))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/", get(serve_production_page))
        .route("/api/auth-password", post(auth_password))
        .merge(protected)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn defect_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/workers", get(list_people))
        .route("/api/products", get(list_catalog_products))
        .route("/api/packaging", get(packaging_for_product))
        .route("/api/serial-lot", get(defect_serial_lots))
        .route("/api/sheet-info", get(packaging_sheet_info))
        .route("/api/save", post(save_defect))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/", get(serve_defect_page))
        .route("/api/auth-password", post(auth_password))
        .merge(protected)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_production_page() -> Html<&'static str> {
    Html(include_str!("./static/production.html"))
}

async fn serve_defect_page() -> Html<&'static str> {
    Html(include_str!("./static/defect.html"))
}

async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let valid = jar
        .get(SESSION_COOKIE)
        .map(|cookie| state.auth.validate_session(cookie.value()))
        .unwrap_or(false);

    if !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Authentication required" })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("X-XSS-Protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

#[axum::debug_handler]
async fn auth_password(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(request): Json<PasswordRequest>,
) -> Response {
    if request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Password is required." })),
        )
            .into_response();
    }

    let stored = state.refdata.stored_password();
    let client = addr.ip().to_string();

    match state.auth.password_attempt(&client, &request.password, &stored) {
        AuthOutcome::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too many failed attempts. Try again later.",
                "retryAfterSecs": retry_after_secs,
            })),
        )
            .into_response(),
        AuthOutcome::Rejected => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Incorrect password." })),
        )
            .into_response(),
        AuthOutcome::Accepted => {
            let token = state.auth.issue_session();
            let cookie = Cookie::build((SESSION_COOKIE, token))
                .http_only(true)
                .same_site(SameSite::Strict)
                .path("/")
                .max_age(time::Duration::seconds(state.auth.ttl_secs() as i64))
                .build();
            (jar.add(cookie), Json(json!({ "success": true }))).into_response()
        }
    }
}

async fn list_products(State(state): State<Arc<AppState>>) -> Json<Vec<Product>> {
    match state.refdata.products() {
        Ok(products) => Json(products),
        Err(e) => {
            // Keep the form usable while the store is down.
            log::error!("product read failed, serving sample catalog: {}", e);
            Json(refdata::sample_products())
        }
    }
}

async fn list_materials(State(state): State<Arc<AppState>>) -> Response {
    match state.refdata.materials_catalog() {
        Ok(materials) => Json(materials).into_response(),
        Err(e) => {
            log::error!("material catalog read failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Could not load the material catalog." })),
            )
                .into_response()
        }
    }
}

async fn list_people(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    match state.refdata.production_team() {
        Ok(names) => Json(names),
        Err(e) => {
            log::error!("people sheet read failed: {}", e);
            Json(Vec::new())
        }
    }
}

async fn list_serial_lots(State(state): State<Arc<AppState>>) -> Json<Vec<SerialLotEntry>> {
    match state.refdata.serial_lots() {
        Ok(lots) => Json(lots.into_iter().map(SerialLotEntry::from).collect()),
        Err(e) => {
            log::error!("serial-lot sheet read failed: {}", e);
            Json(Vec::new())
        }
    }
}

async fn serial_lot_info(State(state): State<Arc<AppState>>) -> Response {
    match state.refdata.serial_lot_sheet_info() {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            log::error!("serial-lot sheet info read failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Could not load the serial-lot sheet info." })),
            )
                .into_response()
        }
    }
}

async fn calculate(Json(request): Json<CalculateRequest>) -> Response {
    let errors = validate_input_weight(request.input_weight);
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response();
    }

    let product = Product {
        product_code: request.product_code,
        product_name: request.product_name,
        base_quantity: request.base_quantity,
        materials: request.materials,
    };
    let materials = scale_materials(&product, request.input_weight);

    Json(CalculateResponse {
        product_code: product.product_code,
        product_name: product.product_name,
        input_weight: request.input_weight,
        materials,
    })
    .into_response()
}

async fn save_production(
    State(state): State<Arc<AppState>>,
    Json(data): Json<ProductionData>,
) -> Response {
    let errors = validate_production_data(&data);
    if !errors.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response();
    }

    let row = flatten_production_data(&data, &korean_timestamp());

    match state.refdata.append_production_row(&row) {
        Ok(()) => Json(json!({
            "message": "Production record saved.",
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(e) => {
            // The record is echoed back so nothing is lost while the
            // store is unreachable.
            log::error!("failed to append production row: {}", e);
            Json(json!({
                "message": "Store unreachable; record returned to the client.",
                "timestamp": Utc::now().to_rfc3339(),
                "data": row,
            }))
            .into_response()
        }
    }
}

async fn list_catalog_products(State(state): State<Arc<AppState>>) -> Response {
    match state.refdata.catalog_products() {
        Ok(products) => Json(products).into_response(),
        Err(e) => {
            log::error!("catalog read failed: {}", e);
            Json(Vec::<refdata::CatalogProduct>::new()).into_response()
        }
    }
}

async fn packaging_for_product(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PackagingQuery>,
) -> Response {
    let Some(product_code) = query.product_code.filter(|code| !code.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "productCode is required." })),
        )
            .into_response();
    };

    match state.refdata.packaging_for_product(&product_code) {
        Ok((packaging, boxed)) => {
            Json(json!({ "packaging": packaging, "box": boxed })).into_response()
        }
        Err(e) => {
            log::error!("packaging lookup failed: {}", e);
            Json(json!({ "packaging": null, "box": null })).into_response()
        }
    }
}

async fn defect_serial_lots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LotQuery>,
) -> Response {
    let Some(packaging_code) = query.packaging_code.filter(|code| !code.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "packagingCode is required." })),
        )
            .into_response();
    };

    match state.refdata.serial_lots_for_item(&packaging_code) {
        Ok(lots) => Json(lots).into_response(),
        Err(e) => {
            log::error!("serial-lot lookup failed: {}", e);
            Json(Vec::<SerialLot>::new()).into_response()
        }
    }
}

async fn packaging_sheet_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.refdata.packaging_sheet_info() {
        Ok(info) => Json(json!({ "info": info })),
        Err(e) => {
            log::error!("packaging sheet info read failed: {}", e);
            Json(json!({ "info": "" }))
        }
    }
}

async fn save_defect(
    State(state): State<Arc<AppState>>,
    Json(data): Json<DefectCheckData>,
) -> Response {
    let row = flatten_defect_data(&data, &korean_timestamp_padded());

    match state.refdata.append_defect_row(&row) {
        Ok(()) => {
            Json(json!({ "success": true, "message": "Defect record saved." })).into_response()
        }
        Err(e) => {
            log::error!("failed to append defect row: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Could not save the defect record." })),
            )
                .into_response()
        }
    }
}
