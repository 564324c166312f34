use clap::Parser;
use std::path::PathBuf;
use task_queue::WorkerArgs;

pub const DEFAULT_VOICE_DESCRIPTION: &str = "The speaker has a clear, friendly tone with a slightly fast pace, and sounds like a helpful assistant.";

#[derive(Parser, Debug, Clone)]
#[command(name = "tts-worker")]
#[command(about = "Speaks replies from tts_jobs", long_about = None)]
pub struct Config {
	/// Speech synthesis endpoint; receives `{text, description}` and answers with audio bytes
	#[arg(long, env = "TTS_URL", default_value = "http://127.0.0.1:9100/synthesize")]
	pub tts_url: String,

	/// Voice style passed with every request
	#[arg(long, env = "TTS_VOICE_DESCRIPTION", default_value = DEFAULT_VOICE_DESCRIPTION)]
	pub voice_description: String,

	/// Directory the synthesized artifacts are written to
	#[arg(long, env = "OUTPUT_DIR", default_value = "output")]
	pub output_dir: PathBuf,

	/// File extension of the written artifacts
	#[arg(long, env = "OUTPUT_EXTENSION", default_value = "wav")]
	pub output_extension: String,

	#[command(flatten)]
	pub worker: WorkerArgs,
}

impl Config {
	/// Validate configuration values
	///
	/// # Errors
	/// Returns a description of the first invalid value.
	pub fn validate(&self) -> Result<(), String> {
		if self.tts_url.trim().is_empty() {
			return Err("tts_url must not be empty".to_string());
		}

		if self.output_extension.is_empty() || self.output_extension.contains(['/', '.']) {
			return Err("output_extension must be a bare extension such as `wav`".to_string());
		}

		self.worker.validate().map_err(|e| e.to_string())
	}
}
