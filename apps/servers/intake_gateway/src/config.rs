use clap::Parser;
use std::path::PathBuf;
use task_queue::{BrokerArgs, TelemetryArgs};

#[derive(Parser, Debug, Clone)]
#[command(name = "intake-gateway")]
#[command(about = "Accepts voice uploads and reports job status", long_about = None)]
pub struct Config {
	/// Address to bind
	#[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
	pub host: String,

	#[arg(long, env = "GATEWAY_PORT", default_value = "8000")]
	pub port: u16,

	/// Directory shared with the ASR worker for uploaded audio
	#[arg(long, env = "UPLOAD_DIR", default_value = "shared_data")]
	pub upload_dir: PathBuf,

	/// Largest accepted request body, in megabytes
	#[arg(long, env = "MAX_UPLOAD_MB", default_value = "25")]
	pub max_upload_mb: usize,

	#[command(flatten)]
	pub broker: BrokerArgs,

	#[command(flatten)]
	pub telemetry: TelemetryArgs,
}

impl Config {
	/// Validate configuration values
	///
	/// # Errors
	/// Returns a description of the first invalid value.
	pub fn validate(&self) -> Result<(), String> {
		if self.port == 0 {
			return Err("port must be greater than 0".to_string());
		}

		if self.max_upload_mb == 0 {
			return Err("max_upload_mb must be greater than 0".to_string());
		}

		if self.upload_dir.as_os_str().is_empty() {
			return Err("upload_dir must not be empty".to_string());
		}

		self.broker.validate().map_err(|e| e.to_string())
	}

	#[must_use]
	pub const fn max_upload_bytes(&self) -> usize {
		self.max_upload_mb * 1024 * 1024
	}
}
