use crate::{AppState, GatewayError};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use task_queue::{JobId, JobPhase, ResultRecord};
use tracing::instrument;

const UPLOAD_FIELD: &str = "audio_file";

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
	pub message: String,
	pub job_id: JobId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocateResponse {
	pub job_id: JobId,
	pub phase: JobPhase,
}

#[axum::debug_handler]
#[instrument(name = "transcribe", skip_all)]
pub async fn transcribe(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<SubmitResponse>, GatewayError> {
	match submit_upload(&state, &mut multipart).await {
		Ok(job_id) => {
			state.metrics.jobs_submitted.inc();
			Ok(Json(SubmitResponse {
				message: "Transcription job submitted.".to_string(),
				job_id,
			}))
		}
		Err(e) => {
			state.metrics.submissions_failed.inc();
			Err(e)
		}
	}
}

async fn submit_upload(state: &AppState, multipart: &mut Multipart) -> Result<JobId, GatewayError> {
	let (file_name, bytes) = read_upload(multipart).await?;
	state.intake.submit(&file_name, bytes).await
}

/// The `audio_file` part, or failing that the first part carrying a file name.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Bytes), GatewayError> {
	while let Some(field) = multipart.next_field().await? {
		if field.name() != Some(UPLOAD_FIELD) && field.file_name().is_none() {
			continue;
		}

		let file_name = field.file_name().unwrap_or_default().to_string();
		let bytes = field.bytes().await?;
		return Ok((file_name, bytes));
	}

	Err(GatewayError::MissingFile)
}

#[axum::debug_handler]
#[instrument(name = "status", skip(state))]
pub async fn status(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<ResultRecord>, GatewayError> {
	state.metrics.status_reads.inc();
	Ok(Json(state.intake.status(&JobId::from(job_id)).await?))
}

#[axum::debug_handler]
#[instrument(name = "locate", skip(state))]
pub async fn locate(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<LocateResponse>, GatewayError> {
	state.metrics.status_reads.inc();
	let job_id = JobId::from(job_id);
	let phase = state.intake.locate(&job_id).await?;
	Ok(Json(LocateResponse { job_id, phase }))
}

#[axum::debug_handler]
pub async fn metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
	task_queue::metrics::render(&state.metrics.registry).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
