use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{auth::auth_handler, bids::bids_handler, gigs::gigs_handler, ws::ws_handler},
    middleware::auth,
    AppState,
};

async fn health_check(Extension(app_state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    let backend = app_state.health.snapshot();
    let status = if backend.degraded { "degraded" } else { "ok" };

    Json(json!({
        "status": status,
        "message": "Server is running",
        "storage": app_state.env.storage_backend.to_str(),
        "notifications": app_state.env.notification_mode.to_str(),
        "backend": backend,
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/gigs", gigs_handler().layer(middleware::from_fn(auth)))
        .nest("/bids", bids_handler().layer(middleware::from_fn(auth)))
        .nest("/ws", ws_handler().layer(middleware::from_fn(auth)))
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .layer(Extension(app_state))
}
