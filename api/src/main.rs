//! Radio news feed API
//!
//! Serves the continuous article feed for the station's news site: every
//! article page opens a feed session, and related stories are appended as
//! the reader scrolls. Uses hexagonal (ports & adapters) architecture for
//! clean separation of concerns.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod config;
mod domain;
mod error;
mod handlers;

#[cfg(test)]
mod test_utils;


use adapters::WordPressClient;
use app::{spawn_session_sweeper, FeedSessionService};
use config::Config;
use domain::ports::ContentSource;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub feed_sessions: Arc<FeedSessionService<dyn ContentSource>>,
    pub config: Config,
}

impl AppState {
    pub fn new(source: Arc<dyn ContentSource>, config: Config) -> Self {
        let feed_sessions = Arc::new(FeedSessionService::new(
            source,
            config.feed.clone(),
            config.max_sessions,
        ));
        Self {
            feed_sessions,
            config,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn build_router(state: AppState) -> Router {
    let mut open_routes = Router::new().route("/feed/sessions", post(handlers::open_session));

    if state.config.rate_limit_enabled {
        // 2 req/sec sustained, burst of 10, keyed on the socket peer address
        let governor_config = Arc::new(
            GovernorConfigBuilder::default()
                .key_extractor(PeerIpKeyExtractor)
                .per_second(2)
                .burst_size(10)
                .finish()
                .expect("Failed to build governor config"),
        );
        open_routes = open_routes.layer(GovernorLayer {
            config: governor_config,
        });
    }

    Router::new()
        // Health check
        .route("/health", get(health))
        // Webhooks (signature verification)
        .route(
            "/webhooks/live-coverage",
            post(handlers::live_coverage_webhook),
        )
        // Feed sessions
        .route(
            "/feed/sessions/:id",
            get(handlers::get_session).delete(handlers::close_session),
        )
        .route(
            "/feed/sessions/:id/advance",
            post(handlers::advance_session),
        )
        .route(
            "/feed/sessions/:id/visibility",
            post(handlers::report_visibility),
        )
        .merge(open_routes)
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,radionews_feed_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting radio news feed API...");

    // Load configuration
    let config = Config::from_env();
    if !config.live_webhook_signed() {
        tracing::warn!("LIVE_WEBHOOK_SECRET not set, live-coverage webhooks are unauthenticated");
    }

    // Create adapters
    let content_source: Arc<dyn ContentSource> = Arc::new(WordPressClient::new(
        config.wordpress_graphql_url.clone(),
        config.wordpress_auth_token.clone(),
        config.wordpress_related_limit,
        config.wordpress_category_limit,
    ));
    tracing::info!(endpoint = %config.wordpress_graphql_url, "Using WordPress content source");

    // Create app state
    let state = AppState::new(content_source, config.clone());

    spawn_session_sweeper(
        state.feed_sessions.clone(),
        config.session_sweep_interval,
        config.session_idle_ttl,
    );

    let app = build_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
