use serde::Serialize;
use std::path::{Path, PathBuf};
use task_queue::{ModelError, SpeechSynthesizer};
use tracing::debug;

/// Posts text to a synthesis service and stores the returned audio as is.
pub struct HttpSynthesizer {
	http: reqwest::Client,
	url: String,
	voice_description: String,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
	text: &'a str,
	description: &'a str,
}

impl HttpSynthesizer {
	///
	/// # Errors
	/// Returns an error if the HTTP client cannot be built.
	pub fn new(url: impl Into<String>, voice_description: impl Into<String>) -> reqwest::Result<Self> {
		Ok(Self {
			http: reqwest::Client::builder().build()?,
			url: url.into(),
			voice_description: voice_description.into(),
		})
	}
}

#[async_trait::async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
	async fn synthesize(&self, text: &str, output_path: &Path) -> Result<PathBuf, ModelError> {
		let request = SynthesisRequest {
			text,
			description: &self.voice_description,
		};

		let response = self.http.post(&self.url).json(&request).send().await.map_err(|e| ModelError::Transport(e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(ModelError::failed(format!("synthesis service returned {status}: {body}")));
		}

		let audio = response.bytes().await.map_err(|e| ModelError::Transport(e.to_string()))?;
		if audio.is_empty() {
			return Err(ModelError::InvalidResponse("synthesis service returned no audio".to_string()));
		}

		if let Some(parent) = output_path.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(output_path, &audio).await?;
		debug!(path = %output_path.display(), bytes = audio.len(), "Wrote synthesized audio");

		Ok(output_path.to_path_buf())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{http::StatusCode, routing::post, Json, Router};
	use serde_json::Value;

	async fn spawn_mock(app: Router) -> String {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{addr}/synthesize")
	}

	#[tokio::test]
	async fn test_writes_returned_audio_and_creates_dir() {
		let app = Router::new().route(
			"/synthesize",
			post(|Json(body): Json<Value>| async move {
				let text = body["text"].as_str().unwrap_or_default();
				let description = body["description"].as_str().unwrap_or_default();
				format!("RIFF:{text}:{description}")
			}),
		);
		let url = spawn_mock(app).await;
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("output").join("J1_response.wav");

		let tts = HttpSynthesizer::new(url, "calm").unwrap();
		let written = tts.synthesize("It is noon.", &target).await.unwrap();

		assert_eq!(written, target);
		assert_eq!(std::fs::read_to_string(&target).unwrap(), "RIFF:It is noon.:calm");
	}

	#[tokio::test]
	async fn test_service_error_writes_nothing() {
		let app = Router::new().route("/synthesize", post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model not loaded") }));
		let url = spawn_mock(app).await;
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("J2_response.wav");

		let tts = HttpSynthesizer::new(url, "calm").unwrap();
		let error = tts.synthesize("hi", &target).await.unwrap_err();

		assert_eq!(error, ModelError::Failed("synthesis service returned 503 Service Unavailable: model not loaded".to_string()));
		assert!(!target.exists());
	}
}
