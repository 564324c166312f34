use crate::handlers::jobs as handlers;
use crate::AppState;
use axum::{
	routing::{get, post},
	Router,
};

pub fn job_routes() -> Router<AppState> {
	Router::new()
		.route("/transcribe", post(handlers::transcribe))
		.route("/status/:job_id", get(handlers::status))
		.route("/jobs/:job_id", get(handlers::locate))
}
