use crate::error::{QueueError, Result};
use axum::{extract::State, http::StatusCode, routing::get, Router};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Per-stage job outcome counter.
#[derive(Clone)]
pub struct StageMetrics {
	stage: &'static str,
	jobs: IntCounterVec,
}

impl StageMetrics {
	///
	/// # Errors
	/// Returns an error if a counter with the same name is already registered.
	pub fn register(registry: &Registry, stage: &'static str) -> Result<Self> {
		let jobs = IntCounterVec::new(Opts::new("stage_jobs_total", "Jobs handled by a pipeline stage, by outcome"), &["stage", "outcome"])?;
		registry.register(Box::new(jobs.clone()))?;
		Ok(Self { stage, jobs })
	}

	pub fn record(&self, outcome: &str) {
		self.jobs.with_label_values(&[self.stage, outcome]).inc();
	}

	#[must_use]
	pub fn count(&self, outcome: &str) -> u64 {
		self.jobs.with_label_values(&[self.stage, outcome]).get()
	}
}

/// Text exposition of everything in `registry`.
///
/// # Errors
/// Returns an error if encoding fails.
pub fn render(registry: &Registry) -> Result<String> {
	let mut buffer = Vec::new();
	TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
	String::from_utf8(buffer).map_err(|e| QueueError::InternalError(e.to_string()))
}

async fn metrics_handler(State(registry): State<Registry>) -> std::result::Result<String, StatusCode> {
	render(&registry).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serves `GET /metrics` until `cancel` fires.
///
/// # Errors
/// This function returns an error if:
/// - The address cannot be bound
/// - The server fails while running
pub async fn serve_metrics(addr: SocketAddr, registry: Registry, cancel: CancellationToken) -> Result<()> {
	let app = Router::new().route("/metrics", get(metrics_handler)).with_state(registry);
	let listener = tokio::net::TcpListener::bind(addr).await?;
	info!(%addr, "Metrics endpoint listening");

	axum::serve(listener, app).with_graceful_shutdown(async move { cancel.cancelled().await }).await?;
	Ok(())
}
