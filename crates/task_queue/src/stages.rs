//! The three pipeline stages, each parameterized by its model capability.

use crate::artifact::output_artifact_path;
use crate::capability::{ModelError, ReplyGenerator, SpeechSynthesizer, SpeechToText};
use crate::job::{JobId, JobOutput, ReplyJob, StageJob, SynthesisJob, TranscriptionJob};
use crate::worker::{Handoff, Stage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Placeholder used in artifact names when a payload carries no job id.
const UNKNOWN_JOB: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptionMode {
	/// Hand the transcript to the reply stage.
	#[default]
	Pipeline,
	/// Store the transcript as the job's final result.
	TranscribeOnly,
}

/// Stage 1: audio artifact to transcript.
///
/// The input audio is owned by this stage and removed after every attempt.
pub struct TranscriptionStage {
	stt: Arc<dyn SpeechToText>,
	mode: TranscriptionMode,
}

impl TranscriptionStage {
	#[must_use]
	pub fn new(stt: Arc<dyn SpeechToText>, mode: TranscriptionMode) -> Self {
		Self { stt, mode }
	}
}

#[async_trait::async_trait]
impl Stage for TranscriptionStage {
	type Input = TranscriptionJob;

	fn name(&self) -> &'static str {
		"transcription"
	}

	fn owned_artifact(&self, input: &TranscriptionJob) -> Option<PathBuf> {
		input.file_path.as_ref().map(PathBuf::from)
	}

	async fn process(&self, job_id: Option<&JobId>, input: TranscriptionJob) -> Result<Handoff, ModelError> {
		let file_path = input.file_path.ok_or(ModelError::MissingInput("file_path"))?;
		let text = self.stt.transcribe(Path::new(&file_path)).await?;

		Ok(match self.mode {
			TranscriptionMode::Pipeline => Handoff::Forward(StageJob::Reply(ReplyJob::new(job_id.cloned(), text))),
			TranscriptionMode::TranscribeOnly => Handoff::Complete(JobOutput::Transcript(text)),
		})
	}
}

/// Stage 2: transcript to reply text.
pub struct ReplyStage {
	generator: Arc<dyn ReplyGenerator>,
}

impl ReplyStage {
	#[must_use]
	pub fn new(generator: Arc<dyn ReplyGenerator>) -> Self {
		Self { generator }
	}
}

#[async_trait::async_trait]
impl Stage for ReplyStage {
	type Input = ReplyJob;

	fn name(&self) -> &'static str {
		"reply"
	}

	async fn process(&self, job_id: Option<&JobId>, input: ReplyJob) -> Result<Handoff, ModelError> {
		let text = input.text_input.ok_or(ModelError::MissingInput("text_input"))?;
		let reply = self.generator.generate(&text).await?;
		Ok(Handoff::Forward(StageJob::Synthesis(SynthesisJob::new(job_id.cloned(), reply))))
	}
}

/// Stage 3: reply text to an audio artifact under `output_dir`.
pub struct SynthesisStage {
	tts: Arc<dyn SpeechSynthesizer>,
	output_dir: PathBuf,
	extension: String,
}

impl SynthesisStage {
	#[must_use]
	pub fn new(tts: Arc<dyn SpeechSynthesizer>, output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
		Self {
			tts,
			output_dir: output_dir.into(),
			extension: extension.into(),
		}
	}
}

#[async_trait::async_trait]
impl Stage for SynthesisStage {
	type Input = SynthesisJob;

	fn name(&self) -> &'static str {
		"synthesis"
	}

	async fn process(&self, job_id: Option<&JobId>, input: SynthesisJob) -> Result<Handoff, ModelError> {
		let text = input.text_to_speech.ok_or(ModelError::MissingInput("text_to_speech"))?;
		let name = job_id.cloned().unwrap_or_else(|| JobId::from(UNKNOWN_JOB));
		let target = output_artifact_path(&self.output_dir, &name, &self.extension);

		let written = self.tts.synthesize(&text, &target).await?;
		Ok(Handoff::Complete(JobOutput::SynthesizedAudio(written.display().to_string())))
	}
}
