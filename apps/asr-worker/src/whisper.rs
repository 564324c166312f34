use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use task_queue::{ModelError, SpeechToText};
use tracing::debug;

/// Client for an OpenAI-compatible `/v1/audio/transcriptions` endpoint.
pub struct WhisperHttpClient {
	http: reqwest::Client,
	url: String,
	model: String,
	api_key: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
	text: String,
}

impl WhisperHttpClient {
	///
	/// # Errors
	/// Returns an error if the HTTP client cannot be built.
	pub fn new(url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> reqwest::Result<Self> {
		Ok(Self {
			http: reqwest::Client::builder().build()?,
			url: url.into(),
			model: model.into(),
			api_key,
		})
	}
}

#[async_trait::async_trait]
impl SpeechToText for WhisperHttpClient {
	async fn transcribe(&self, audio_path: &Path) -> Result<String, ModelError> {
		let audio = tokio::fs::read(audio_path).await?;
		let file_name = audio_path.file_name().map_or_else(|| "audio".to_string(), |name| name.to_string_lossy().into_owned());
		debug!(path = %audio_path.display(), bytes = audio.len(), "Sending audio for transcription");

		let form = Form::new().text("model", self.model.clone()).part("file", Part::bytes(audio).file_name(file_name));

		let mut request = self.http.post(&self.url).multipart(form);
		if let Some(key) = &self.api_key {
			request = request.bearer_auth(key);
		}

		let response = request.send().await.map_err(|e| ModelError::Transport(e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(ModelError::failed(format!("transcription service returned {status}: {body}")));
		}

		let body: TranscriptionResponse = response.json().await.map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
		Ok(body.text)
	}
}
