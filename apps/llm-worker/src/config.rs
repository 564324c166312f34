use clap::{Parser, ValueEnum};
use task_queue::WorkerArgs;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
	/// Google Gemini `generateContent`
	Gemini,
	/// Any OpenAI-compatible `/v1/chat/completions` server
	Openai,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "llm-worker")]
#[command(about = "Answers transcripts from llm_jobs", long_about = None)]
pub struct Config {
	#[arg(long, env = "LLM_PROVIDER", value_enum, default_value_t = Provider::Gemini)]
	pub provider: Provider,

	/// Model name passed to the provider
	#[arg(long, env = "LLM_MODEL", default_value = "gemini-2.5-flash")]
	pub model: String,

	#[arg(long, env = "GEMINI_API_KEY")]
	pub gemini_api_key: Option<String>,

	#[arg(long, env = "GEMINI_BASE_URL", default_value = "https://generativelanguage.googleapis.com")]
	pub gemini_base_url: String,

	#[arg(long, env = "OPENAI_BASE_URL", default_value = "http://127.0.0.1:8080")]
	pub openai_base_url: String,

	#[arg(long, env = "OPENAI_API_KEY")]
	pub openai_api_key: Option<String>,

	/// Reply forwarded to synthesis when generation fails; failures are terminal when unset
	#[arg(long, env = "FALLBACK_REPLY")]
	pub fallback_reply: Option<String>,

	#[command(flatten)]
	pub worker: WorkerArgs,
}

impl Config {
	/// Validate configuration values
	///
	/// # Errors
	/// Returns a description of the first invalid value.
	pub fn validate(&self) -> Result<(), String> {
		if self.model.trim().is_empty() {
			return Err("model must not be empty".to_string());
		}

		if self.provider == Provider::Gemini && self.gemini_api_key.as_deref().map_or(true, |key| key.trim().is_empty()) {
			return Err("GEMINI_API_KEY is required for the gemini provider".to_string());
		}

		self.worker.validate().map_err(|e| e.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_gemini_requires_api_key() {
		let config = Config::try_parse_from(["llm-worker", "--redis-url", "redis://x", "--gemini-api-key", ""]).unwrap();
		assert!(config.validate().is_err());

		let config = Config::try_parse_from(["llm-worker", "--redis-url", "redis://x", "--gemini-api-key", "k"]).unwrap();
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_openai_provider_needs_no_key() {
		let config = Config::try_parse_from(["llm-worker", "--redis-url", "redis://x", "--provider", "openai", "--model", "llama3"]).unwrap();
		assert_eq!(config.provider, Provider::Openai);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_fallback_reply_flag() {
		let config = Config::try_parse_from(["llm-worker", "--redis-url", "redis://x", "--fallback-reply", "Sorry, I couldn't generate a response."]).unwrap();
		assert_eq!(config.fallback_reply.as_deref(), Some("Sorry, I couldn't generate a response."));
	}
}
