//! External model capabilities, one trait per stage.
//!
//! Implementations are injected into the stages at construction, so a
//! different model backend never touches the worker loop.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of an external capability for a single job.
///
/// The `Display` output is what ends up in the failed result record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
	/// The model itself reported an error; the message is passed through as is.
	#[error("{0}")]
	Failed(String),

	#[error("job payload is missing `{0}`")]
	MissingInput(&'static str),

	#[error("model service request failed: {0}")]
	Transport(String),

	#[error("model service returned an unusable response: {0}")]
	InvalidResponse(String),
}

impl ModelError {
	#[must_use]
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed(message.into())
	}
}

impl From<std::io::Error> for ModelError {
	fn from(error: std::io::Error) -> Self {
		Self::Failed(error.to_string())
	}
}

#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
	async fn transcribe(&self, audio_path: &Path) -> Result<String, ModelError>;
}

#[async_trait::async_trait]
pub trait ReplyGenerator: Send + Sync {
	async fn generate(&self, text: &str) -> Result<String, ModelError>;
}

#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
	/// Writes speech for `text` to `output_path` and returns the path of the
	/// written artifact.
	async fn synthesize(&self, text: &str, output_path: &Path) -> Result<PathBuf, ModelError>;
}
