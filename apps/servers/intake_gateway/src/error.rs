use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use task_queue::QueueError;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
	#[error("Redis service is not available.")]
	BrokerUnavailable(String),

	#[error("Failed to submit job: {0}")]
	Submission(String),

	#[error("no file part in the request")]
	MissingFile,

	#[error("malformed multipart body: {0}")]
	Multipart(#[from] MultipartError),

	#[error("broker error: {0}")]
	Broker(#[from] QueueError),
}

#[derive(Serialize)]
struct ErrorBody {
	detail: String,
}

impl GatewayError {
	fn status_code(&self) -> StatusCode {
		match self {
			Self::BrokerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
			Self::Submission(_) | Self::Broker(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
			// 413 when the body limit was hit, 400 otherwise.
			Self::Multipart(e) => e.status(),
		}
	}
}

impl IntoResponse for GatewayError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		match &self {
			Self::BrokerUnavailable(reason) => tracing::warn!(reason = %reason, "Rejecting request, broker unavailable"),
			Self::Submission(_) | Self::Broker(_) => tracing::error!(error = %self, "Request failed"),
			Self::MissingFile | Self::Multipart(_) => tracing::debug!(error = %self, "Bad request"),
		}

		(status, Json(ErrorBody { detail: self.to_string() })).into_response()
	}
}
