use clap::Parser;
use task_queue::{TranscriptionMode, WorkerArgs};

#[derive(Parser, Debug, Clone)]
#[command(name = "asr-worker")]
#[command(about = "Transcribes uploaded audio from transcription_jobs", long_about = None)]
pub struct Config {
	/// OpenAI-compatible transcription endpoint
	#[arg(long, env = "ASR_URL", default_value = "http://127.0.0.1:9000/v1/audio/transcriptions")]
	pub asr_url: String,

	/// Model name sent with each request
	#[arg(long, env = "ASR_MODEL", default_value = "whisper-1")]
	pub asr_model: String,

	#[arg(long, env = "ASR_API_KEY")]
	pub asr_api_key: Option<String>,

	/// Store the transcript as the final result instead of asking for a reply
	#[arg(long, env = "TRANSCRIBE_ONLY", default_value_t = false)]
	pub transcribe_only: bool,

	#[command(flatten)]
	pub worker: WorkerArgs,
}

impl Config {
	/// Validate configuration values
	///
	/// # Errors
	/// Returns a description of the first invalid value.
	pub fn validate(&self) -> Result<(), String> {
		if self.asr_url.trim().is_empty() {
			return Err("asr_url must not be empty".to_string());
		}

		if self.asr_model.trim().is_empty() {
			return Err("asr_model must not be empty".to_string());
		}

		self.worker.validate().map_err(|e| e.to_string())
	}

	#[must_use]
	pub const fn mode(&self) -> TranscriptionMode {
		if self.transcribe_only {
			TranscriptionMode::TranscribeOnly
		} else {
			TranscriptionMode::Pipeline
		}
	}
}
