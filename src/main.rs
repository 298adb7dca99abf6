use axum::{
    Router,
    routing::{get, post},
    middleware::from_fn,
    extract::DefaultBodyLimit,
};

use http::{HeaderValue, Method, header};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
    cors::CorsLayer,
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;

mod models {
    pub mod selection;
    pub mod session;
    pub mod itinerary;
    pub mod trip;
    pub mod workflow;
}

mod repositories {
    pub mod session;
    pub mod trip;
}

mod services {
    pub mod prompt;
    pub mod parser;
    pub mod identity;
    pub mod ai;
    pub mod orchestrator;
}

mod handlers {
    pub mod auth;
    pub mod trips;
}

mod middleware_layer {
    pub mod client;
}

mod validation {
    pub mod trip;
}

use config::Config;
use state::AppState;

/// How often idle workflows are swept.
const EVICTION_INTERVAL: Duration = Duration::from_secs(3600);

/// How long a workflow may sit unused before it is dropped.
const WORKFLOW_MAX_IDLE: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let pool = db::create_pool(&config.database_url)?;
    db::ensure_schema(&pool).await?;

    let state = AppState::new(&config, pool).await?;
    tracing::info!("✅ AppState initialized");

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid origin in ALLOWED_ORIGINS: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .use_headers()
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let limited_routes = Router::new()
        .route("/api/trips/generate", post(handlers::trips::generate))
        .route("/api/auth/google", post(handlers::auth::google_login))
        .layer(tower_governor::GovernorLayer::new(governor_conf.clone()))
        .with_state(state.clone());

    let open_routes = Router::new()
        .route("/api/trips/workflow", get(handlers::trips::workflow_status))
        .route("/api/trips/{trip_id}", get(handlers::trips::view_trip))
        .route("/api/auth/abandon", post(handlers::auth::abandon))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    let app = Router::new()
        .merge(limited_routes)
        .merge(open_routes)
        .layer(
            ServiceBuilder::new()
                .layer(CookieManagerLayer::new())
                .layer(from_fn(middleware_layer::client::ensure_client)),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors);

    let registry = state.workflows.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(EVICTION_INTERVAL).await;
            let evicted = registry.evict_idle(WORKFLOW_MAX_IDLE);
            tracing::info!(
                "🧹 Evicted {} idle workflows ({} still live)",
                evicted,
                registry.len()
            );
        }
    });

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background eviction job started (runs every hour)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
