use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

mod apply;
pub mod common;

pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Apply (别名路径兼容旧版页面)
        .route("/api/apply", post(apply::handle_apply))
        .route("/apply", post(apply::handle_apply))
        // Health
        .route(
            "/health",
            get(|| async { axum::Json(serde_json::json!({ "ok": true })) }),
        )
        .with_state(state)
}
