// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP request handlers. Each one extracts its inputs, calls a repository
// and wraps the result in the `{ success, data, count?, message? }`
// envelope. Errors are `AppError`s and render themselves.
//
// Handlers taking an `AuthAdmin` argument are admin-only.
// =============================================================================

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::AuthAdmin;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::*;
use crate::repos::products::ProductQuery;
use crate::AppState;

type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

// =============================================================================
// HEALTH CHECK ENDPOINTS
// =============================================================================

/// Liveness probe
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "storefront-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness probe
///
/// The file store is always available as a fallback, so the service is
/// ready whenever its data directory exists. The response also reports
/// which backend is serving records right now.
///
/// GET /ready
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let data_dir = tokio::fs::try_exists(state.repos.data_dir())
        .await
        .unwrap_or(false);

    let selector = state.repos.selector();
    let database = if state.repos.has_database() {
        selector.state().as_str().to_string()
    } else {
        "not_configured".to_string()
    };

    let (code, status) = if data_dir {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(ReadinessResponse {
            status: status.to_string(),
            checks: ReadinessChecks {
                backend: selector.active_backend(),
                database,
                data_dir,
            },
        }),
    )
}

// =============================================================================
// METRICS ENDPOINT
// =============================================================================
/// Prometheus metrics in text exposition format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

// =============================================================================
// PUBLIC STOREFRONT
// =============================================================================

// -----------------------------------------------------------------------------
// QUERY PARAMETERS
// -----------------------------------------------------------------------------
/// GET /api/products?category=shirts&featured=true&limit=20
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub category: Option<String>,

    /// Only the literal "true" filters; anything else means no filter
    pub featured: Option<String>,

    pub min_stock: Option<u32>,

    #[serde(default = "default_product_limit")]
    pub limit: usize,
}

fn default_product_limit() -> usize {
    20
}

/// GET /api/admin/orders?status=pending&limit=50
#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,

    #[serde(default = "default_order_limit")]
    pub limit: usize,
}

fn default_order_limit() -> usize {
    50
}

// -----------------------------------------------------------------------------
// PRODUCTS
// -----------------------------------------------------------------------------
/// GET /api/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductListParams>,
) -> ApiResult<Vec<Product>> {
    let query = ProductQuery {
        category: params.category.filter(|c| !c.is_empty()),
        featured: (params.featured.as_deref() == Some("true")).then_some(true),
        min_stock: params.min_stock,
        limit: Some(params.limit),
    };

    let products = state.repos.products.list(&query).await;
    let count = products.len();
    Ok(Json(ApiResponse::data(products).with_count(count)))
}

/// GET /api/product/:id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Product> {
    let product = state.repos.products.get(&id).await?;
    Ok(Json(ApiResponse::data(product)))
}

// -----------------------------------------------------------------------------
// CHECKOUT
// -----------------------------------------------------------------------------
/// Place an order
///
/// POST /api/orders
///
/// # Request Body
/// ```json
/// {
///   "productId": "lz3k9x0a1b2c3d4e5f",
///   "quantity": 2,
///   "customerName": "Sara",
///   "customerPhone": "0100000000"
/// }
/// ```
///
/// # Response
/// - 201 Created: order stored with its code and total
/// - 400 Bad Request: missing fields or below the minimum order amount
/// - 404 Not Found: product doesn't exist
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let settings = state.repos.settings.get().await;
    let order = state
        .repos
        .orders
        .place(&state.repos.products, &settings, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(order).with_message("Order placed successfully")),
    ))
}

// =============================================================================
// ADMIN API
// =============================================================================

// -----------------------------------------------------------------------------
// AUTHENTICATION
// -----------------------------------------------------------------------------
/// POST /api/admin/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let admin = state
        .repos
        .admins
        .authenticate(&request.username, &request.password)
        .await?;
    let token = state.tokens.issue(&admin)?;

    Ok(Json(ApiResponse::data(LoginResponse {
        token,
        user: AdminProfile::from(&admin),
    })))
}

/// Create another back-office account (super admins only)
///
/// POST /api/admin/admins
pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    AuthAdmin(claims): AuthAdmin,
    Json(input): Json<NewAdmin>,
) -> AppResult<(StatusCode, Json<ApiResponse<AdminProfile>>)> {
    if claims.role != AdminRole::SuperAdmin {
        return Err(AppError::Forbidden(
            "Only super admins can create accounts".to_string(),
        ));
    }

    let admin = state.repos.admins.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(AdminProfile::from(&admin)).with_message("Admin created")),
    ))
}

/// POST /api/admin/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthAdmin(claims): AuthAdmin,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    state
        .repos
        .admins
        .change_password(&claims.username, &request.current_password, &request.new_password)
        .await?;
    Ok(Json(ApiResponse::message("Password changed successfully")))
}

// -----------------------------------------------------------------------------
// PRODUCT MANAGEMENT
// -----------------------------------------------------------------------------
/// POST /api/admin/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
    Json(input): Json<NewProduct>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let product = state.repos.products.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(product).with_message("Product created")),
    ))
}

/// PUT /api/admin/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> ApiResult<Product> {
    let product = state.repos.products.update(&id, patch).await?;
    Ok(Json(ApiResponse::data(product).with_message("Product updated")))
}

/// DELETE /api/admin/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repos.products.delete(&id).await?;
    Ok(Json(ApiResponse::message("Product deleted")))
}

// -----------------------------------------------------------------------------
// ORDER MANAGEMENT
// -----------------------------------------------------------------------------
/// GET /api/admin/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
    Query(params): Query<OrderListParams>,
) -> ApiResult<Vec<Order>> {
    let orders = state
        .repos
        .orders
        .list(params.status, Some(params.limit))
        .await;
    let count = orders.len();
    Ok(Json(ApiResponse::data(orders).with_count(count)))
}

/// POST /api/admin/orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
    Json(input): Json<NewOrder>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let order = state.repos.orders.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(order).with_message("Order created")),
    ))
}

/// PUT /api/admin/orders/:id
pub async fn update_order(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> ApiResult<Order> {
    let order = state.repos.orders.update(&id, patch).await?;
    Ok(Json(ApiResponse::data(order).with_message("Order updated")))
}

/// DELETE /api/admin/orders/:id
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repos.orders.delete(&id).await?;
    Ok(Json(ApiResponse::message("Order deleted")))
}

// -----------------------------------------------------------------------------
// SETTINGS
// -----------------------------------------------------------------------------
/// GET /api/admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
) -> ApiResult<Settings> {
    Ok(Json(ApiResponse::data(state.repos.settings.get().await)))
}

/// Merge a partial settings document
///
/// PUT /api/admin/settings
///
/// # Request Body
/// ```json
/// { "orders": { "deliveryFee": 5 } }
/// ```
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
    Json(patch): Json<Value>,
) -> ApiResult<Settings> {
    let settings = state.repos.settings.update(patch).await?;
    Ok(Json(ApiResponse::data(settings).with_message("Settings saved")))
}

// -----------------------------------------------------------------------------
// REPORTS
// -----------------------------------------------------------------------------
/// GET /api/admin/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
) -> ApiResult<DashboardStats> {
    let stats = state.repos.dashboard_stats(Local::now()).await;
    metrics::set_low_stock_count(stats.low_stock_count);
    Ok(Json(ApiResponse::data(stats)))
}

/// GET /api/admin/storage
pub async fn storage_usage(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
) -> ApiResult<StorageUsage> {
    Ok(Json(ApiResponse::data(state.repos.storage_usage().await)))
}

/// Every product with its effective price and stock status
///
/// GET /api/admin/inventory
pub async fn inventory(
    State(state): State<Arc<AppState>>,
    _admin: AuthAdmin,
) -> ApiResult<InventoryReport> {
    let thresholds = state.repos.settings.get().await.thresholds();
    let report = state.repos.products.inventory_report(thresholds).await;

    metrics::set_low_stock_count(
        report.summary.low_stock + report.summary.critical + report.summary.out_of_stock,
    );

    let count = report.items.len();
    Ok(Json(ApiResponse::data(report).with_count(count)))
}
