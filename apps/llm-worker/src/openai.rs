use crate::prompt::reply_prompt;
use serde::Deserialize;
use serde_json::json;
use task_queue::{ModelError, ReplyGenerator};

/// OpenAI-compatible chat completions, e.g. a local llama.cpp or vLLM server.
pub struct ChatCompletionsClient {
	http: reqwest::Client,
	base_url: String,
	model: String,
	api_key: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
	#[serde(default)]
	choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
	message: Message,
}

#[derive(Deserialize)]
struct Message {
	#[serde(default)]
	content: Option<String>,
}

impl ChatCompletionsClient {
	///
	/// # Errors
	/// Returns an error if the HTTP client cannot be built.
	pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> reqwest::Result<Self> {
		Ok(Self {
			http: reqwest::Client::builder().build()?,
			base_url: base_url.into(),
			model: model.into(),
			api_key,
		})
	}
}

#[async_trait::async_trait]
impl ReplyGenerator for ChatCompletionsClient {
	async fn generate(&self, text: &str) -> Result<String, ModelError> {
		let body = json!({
			"model": self.model,
			"messages": [{ "role": "user", "content": reply_prompt(text) }],
		});

		let mut request = self.http.post(format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))).json(&body);
		if let Some(key) = &self.api_key {
			request = request.bearer_auth(key);
		}

		let response = request.send().await.map_err(|e| ModelError::Transport(e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			let raw = response.text().await.unwrap_or_default();
			return Err(ModelError::failed(format!("chat completion returned {status}: {raw}")));
		}

		let parsed: ChatResponse = response.json().await.map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
		parsed
			.choices
			.into_iter()
			.next()
			.and_then(|choice| choice.message.content)
			.ok_or_else(|| ModelError::InvalidResponse("no message content in response".to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{routing::post, Json, Router};

	#[tokio::test]
	async fn test_reads_first_choice() {
		let app = Router::new().route(
			"/v1/chat/completions",
			post(|Json(body): Json<serde_json::Value>| async move {
				let model = body["model"].as_str().unwrap_or_default().to_string();
				Json(json!({ "choices": [{ "message": { "role": "assistant", "content": format!("{model} says noon") } }] }))
			}),
		);
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let base = format!("http://{}", listener.local_addr().unwrap());
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});

		let client = ChatCompletionsClient::new(base, "llama3", None).unwrap();
		assert_eq!(client.generate("what time is it").await.unwrap(), "llama3 says noon");
	}

	#[tokio::test]
	async fn test_unreachable_server_is_a_transport_error() {
		let client = ChatCompletionsClient::new("http://127.0.0.1:1", "llama3", None).unwrap();
		assert!(matches!(client.generate("hi").await, Err(ModelError::Transport(_))));
	}
}
