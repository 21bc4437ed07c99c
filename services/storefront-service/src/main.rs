// =============================================================================
// STOREFRONT SERVICE - Main Entry Point
// =============================================================================
// Product catalog, public checkout and admin back office for a small
// clothing storefront.
//
// WHAT THIS SERVICE DOES:
// - Serves the product catalog and accepts customer orders
// - Lets admins manage products, orders, settings and inventory
// - Stores records in PostgreSQL while it is reachable and in JSON files
//   under DATA_DIR while it is not, switching automatically
// - Exposes Prometheus metrics, including which backend is active
// =============================================================================

// -----------------------------------------------------------------------------
// MODULE DECLARATIONS
// -----------------------------------------------------------------------------
mod auth;        // Password hashing, tokens, admin extractor (auth.rs)
mod backend;     // Backend selector and database monitor (backend.rs)
mod config;      // Configuration loading (config.rs)
mod error;       // Error types (error.rs)
mod handlers;    // HTTP request handlers (handlers.rs)
mod metrics;     // Prometheus metrics setup (metrics.rs)
mod models;      // Data structures (models.rs)
mod pricing;     // Price and stock derivations (pricing.rs)
mod repos;       // Domain repositories (repos/)
mod seed;        // First-boot data (seed.rs)
mod store;       // Record stores: file and PostgreSQL (store/)

// -----------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::TokenService;
use crate::backend::{monitor_database, BackendSelector};
use crate::config::{Config, DEFAULT_JWT_SECRET};
use crate::metrics::setup_metrics;
use crate::models::Admin;
use crate::repos::admins::ensure_default_admin;
use crate::repos::Repositories;
use crate::store::postgres::PgDatabase;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Shared by every handler through State<Arc<AppState>>.
pub struct AppState {
    // Repositories over the routed record stores and the settings file
    pub repos: Repositories,

    // Signs and verifies admin tokens
    pub tokens: TokenService,

    // Prometheus metrics handle
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

// -----------------------------------------------------------------------------
// MAIN FUNCTION
// -----------------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -------------------------------------------------------------------------
    // STEP 1: Load environment variables
    // -------------------------------------------------------------------------
    dotenvy::dotenv().ok();

    // -------------------------------------------------------------------------
    // STEP 2: Initialize logging/tracing
    // -------------------------------------------------------------------------
    // RUST_LOG controls log levels, e.g. RUST_LOG=info,storefront_service=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Storefront Service...");

    // -------------------------------------------------------------------------
    // STEP 3: Load configuration
    // -------------------------------------------------------------------------
    let config = Config::from_env()?;
    info!(
        port = config.port,
        data_dir = %config.data_dir.display(),
        database = config.database_url.is_some(),
        "Configuration loaded"
    );

    if config.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("JWT_SECRET is not set; admin tokens are signed with the built-in default");
    }

    // -------------------------------------------------------------------------
    // STEP 4: Set up Prometheus metrics
    // -------------------------------------------------------------------------
    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    // -------------------------------------------------------------------------
    // STEP 5: Prepare the file store
    // -------------------------------------------------------------------------
    // The file store must always be usable: it serves every request until
    // (and whenever) the database is not.
    seed::seed_file_store(&config.data_dir).await?;
    info!("File store ready");

    // -------------------------------------------------------------------------
    // STEP 6: Start the database monitor
    // -------------------------------------------------------------------------
    // The pool connects lazily, so a database that is down at startup only
    // means we begin on the file store.
    let selector = BackendSelector::new();
    crate::metrics::set_backend_connected(false);

    let database = match &config.database_url {
        Some(url) => {
            let db = PgDatabase::connect_lazy(url)?;
            let admins = Arc::new(db.store::<Admin>());

            tokio::spawn(monitor_database(
                db.clone(),
                selector.clone(),
                config.db_health_interval,
                move || {
                    let admins = admins.clone();
                    async move {
                        if let Err(e) = ensure_default_admin(admins.as_ref()).await {
                            warn!(error = %e, "Could not seed default admin into database");
                        }
                    }
                },
            ));
            info!("Database monitor started");
            Some(db)
        }
        None => {
            warn!("DATABASE_URL not set; running on the file store only");
            None
        }
    };

    // -------------------------------------------------------------------------
    // STEP 7: Create application state
    // -------------------------------------------------------------------------
    let state = Arc::new(AppState {
        repos: Repositories::new(
            &config.data_dir,
            &config.uploads_dir,
            database,
            selector,
        ),
        tokens: TokenService::new(&config.jwt_secret, config.token_ttl),
        metrics_handle,
    });

    // -------------------------------------------------------------------------
    // STEP 8: Define routes
    // -------------------------------------------------------------------------
    let app = Router::new()
        // ----- Public storefront -----
        .route("/api/products", get(handlers::list_products))
        .route("/api/product/:id", get(handlers::get_product))
        .route("/api/orders", post(handlers::place_order))
        // ----- Admin API -----
        .route("/api/admin/login", post(handlers::login))
        .route("/api/admin/change-password", post(handlers::change_password))
        .route("/api/admin/admins", post(handlers::create_admin))
        .route("/api/admin/products", post(handlers::create_product))
        .route(
            "/api/admin/products/:id",
            put(handlers::update_product).delete(handlers::delete_product),
        )
        .route(
            "/api/admin/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route(
            "/api/admin/orders/:id",
            put(handlers::update_order).delete(handlers::delete_order),
        )
        .route(
            "/api/admin/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/api/admin/dashboard", get(handlers::dashboard))
        .route("/api/admin/storage", get(handlers::storage_usage))
        .route("/api/admin/inventory", get(handlers::inventory))
        // ----- Health & Metrics -----
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        // Request count/latency per matched route
        .route_layer(middleware::from_fn(crate::metrics::track_http))
        // ----- Middleware Layers -----
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // -------------------------------------------------------------------------
    // STEP 9: Start the HTTP server
    // -------------------------------------------------------------------------
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Storefront Service is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
