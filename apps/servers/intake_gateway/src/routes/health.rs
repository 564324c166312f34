use crate::handlers::{health::health, jobs::metrics};
use crate::AppState;
use axum::{routing::get, Router};

pub fn health_routes() -> Router<AppState> {
	Router::new().route("/health", get(health)).route("/metrics", get(metrics))
}
