//! Studio Backend - library for app logic and testing

pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod logging;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::{DbConfig, MemoryStore, PgStore, StudioStore};
use crate::error::StartupError;
use crate::images::{CloudinaryHost, ImageHost, MAX_UPLOAD_BYTES};
use crate::state::{AppState, SharedState};

/// Request body cap: the largest upload plus room for the other form fields.
const MAX_BODY_BYTES: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

fn dev_origins() -> Vec<HeaderValue> {
    vec![
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ]
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to the local frontend dev server.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(dev_origins);

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

fn api_routes() -> Router<SharedState> {
    Router::new()
        // Public
        .route("/gallery", get(routes::gallery::list_images))
        .route(
            "/gallery/stats/categories",
            get(routes::gallery::category_stats),
        )
        .route("/gallery/{id}", get(routes::gallery::get_image))
        .route("/contact", post(routes::contacts::submit_contact))
        .route("/content", get(routes::content::list_content))
        .route("/content/{section}", get(routes::content::get_content))
        // Admin
        .route("/admin/login", post(routes::auth::login))
        .route("/admin/verify", get(routes::auth::verify_token))
        .route(
            "/admin/gallery",
            get(routes::gallery::admin_list_images).post(routes::gallery::upload_image),
        )
        .route(
            "/admin/gallery/{id}",
            get(routes::gallery::admin_get_image)
                .put(routes::gallery::update_image)
                .delete(routes::gallery::delete_image),
        )
        .route("/admin/contacts", get(routes::contacts::list_contacts))
        .route(
            "/admin/contacts/{id}",
            get(routes::contacts::get_contact).put(routes::contacts::update_contact),
        )
        .route("/admin/analytics", get(routes::analytics::get_analytics))
        .route("/admin/content", get(routes::content::admin_list_content))
        .route(
            "/admin/content/{section}",
            put(routes::content::upsert_content),
        )
}

/// Create and configure the application router.
pub fn create_app(state: SharedState) -> Router {
    let cors = configure_cors();

    // Throttle the API only; health checks must not spend a client's budget.
    let api = api_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::limit_requests,
    ));

    Router::new()
        .nest("/api", api)
        .route("/health", get(routes::health::health_ping))
        .route("/health/ready", get(routes::health::health_ready))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
}

async fn connect_store() -> Result<Arc<dyn StudioStore>, StartupError> {
    match DbConfig::from_env() {
        Some(db_config) => {
            let pool = db::init_pool(&db_config).await?;
            db::run_migrations(&pool).await?;
            let store: Arc<dyn StudioStore> = Arc::new(PgStore::new(pool));
            Ok(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            let store: Arc<dyn StudioStore> = Arc::new(MemoryStore::new());
            Ok(store)
        }
    }
}

fn connect_image_host(config: &AppConfig) -> Result<Option<Arc<dyn ImageHost>>, StartupError> {
    match &config.cloudinary {
        Some(cloudinary) => {
            let host = CloudinaryHost::new(cloudinary.clone())?;
            tracing::info!(folder = %cloudinary.folder, "image hosting configured");
            let host: Arc<dyn ImageHost> = Arc::new(host);
            Ok(Some(host))
        }
        None => Ok(None),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    // Guards must live until the server exits or buffered lines are lost.
    let _log_guards = logging::init(&logging::LogConfig::from_env());

    let config = AppConfig::from_env()?;
    let store = connect_store().await?;
    let images = connect_image_host(&config)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| StartupError::InvalidAddress(format!("{}:{}", config.host, config.port)))?;

    tracing::info!(
        environment = config.environment.as_str(),
        store = store.backend(),
        "Starting server on {}",
        addr
    );

    let app = create_app(AppState::new(config, store, images));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}
