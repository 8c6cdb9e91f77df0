use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(handlers::pages::index))
        .route(
            "/switches",
            get(handlers::pages::switches_form).post(handlers::pages::switches_submit),
        )
        .route(
            "/routers",
            get(handlers::pages::routers_form).post(handlers::pages::routers_submit),
        )
        // JSON API
        .route("/api/health", get(handlers::healthcheck))
        .route("/api/:class/preview", post(handlers::api::preview))
        .route("/api/:class/run", post(handlers::api::run))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
