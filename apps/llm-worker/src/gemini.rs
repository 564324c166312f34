use crate::prompt::reply_prompt;
use serde::Deserialize;
use serde_json::json;
use task_queue::{ModelError, ReplyGenerator};

/// Gemini `models/{model}:generateContent` over REST.
pub struct GeminiClient {
	http: reqwest::Client,
	base_url: String,
	model: String,
	api_key: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
	#[serde(default)]
	candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
	content: Content,
}

#[derive(Deserialize)]
struct Content {
	#[serde(default)]
	parts: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
	#[serde(default)]
	text: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
	error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
	message: String,
}

impl GeminiClient {
	///
	/// # Errors
	/// Returns an error if the HTTP client cannot be built.
	pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> reqwest::Result<Self> {
		Ok(Self {
			http: reqwest::Client::builder().build()?,
			base_url: base_url.into(),
			model: model.into(),
			api_key: api_key.into(),
		})
	}

	fn endpoint(&self) -> String {
		format!("{}/v1beta/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
	}
}

#[async_trait::async_trait]
impl ReplyGenerator for GeminiClient {
	async fn generate(&self, text: &str) -> Result<String, ModelError> {
		let body = json!({ "contents": [{ "parts": [{ "text": reply_prompt(text) }] }] });

		let response = self
			.http
			.post(self.endpoint())
			.header("x-goog-api-key", &self.api_key)
			.json(&body)
			.send()
			.await
			.map_err(|e| ModelError::Transport(e.to_string()))?;

		let status = response.status();
		let raw = response.text().await.map_err(|e| ModelError::Transport(e.to_string()))?;

		if !status.is_success() {
			// Pass the provider's own message through, it ends up in the result record.
			return Err(match serde_json::from_str::<ErrorEnvelope>(&raw) {
				Ok(envelope) => ModelError::Failed(envelope.error.message),
				Err(_) => ModelError::failed(format!("gemini returned {status}: {raw}")),
			});
		}

		let parsed: GenerateResponse = serde_json::from_str(&raw).map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
		let candidate = parsed.candidates.into_iter().next().ok_or_else(|| ModelError::InvalidResponse("no candidates in response".to_string()))?;

		Ok(candidate.content.parts.into_iter().map(|part| part.text).collect())
	}
}
