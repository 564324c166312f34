use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod intake;
pub mod metrics;
pub mod routes;

pub use config::Config;
pub use error::GatewayError;
pub use intake::{BrokerHandle, Intake};
pub use metrics::GatewayMetrics;

#[derive(Clone)]
pub struct AppState {
	pub intake: Arc<Intake>,
	pub metrics: GatewayMetrics,
}

impl AppState {
	#[must_use]
	pub fn new(intake: Intake, metrics: GatewayMetrics) -> Self {
		Self {
			intake: Arc::new(intake),
			metrics,
		}
	}
}

/// Every gateway route with tracing and the upload size limit applied.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
	Router::new()
		.merge(routes::jobs::job_routes())
		.merge(routes::health::health_routes())
		.with_state(state)
		.layer(DefaultBodyLimit::disable())
		.layer(RequestBodyLimitLayer::new(max_upload_bytes))
		.layer(TraceLayer::new_for_http())
}
