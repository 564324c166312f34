//! Job identity, stage payloads and the terminal result record.
//!
//! A job has no storage of its own. Where it currently is gets derived from
//! which queue holds a payload carrying its id, and whether a record exists
//! under `result:{job_id}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

pub const RESULT_KEY_PREFIX: &str = "result:";

/// Opaque, globally unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
	/// Generates a new random UUID v4-based `JobId`.
	#[must_use]
	pub fn new() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Key of this job's record in the result store.
	#[must_use]
	pub fn result_key(&self) -> String {
		format!("{RESULT_KEY_PREFIX}{}", self.0)
	}
}

impl Default for JobId {
	fn default() -> Self {
		Self::new()
	}
}

impl From<String> for JobId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl From<&str> for JobId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// The three fixed stage input queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
	Transcription,
	Reply,
	Synthesis,
}

impl QueueName {
	pub const ALL: [Self; 3] = [Self::Transcription, Self::Reply, Self::Synthesis];

	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Transcription => "transcription_jobs",
			Self::Reply => "llm_jobs",
			Self::Synthesis => "tts_jobs",
		}
	}
}

impl fmt::Display for QueueName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A payload that lives on one specific stage queue.
///
/// Fields are looked up, never validated: a missing or wrongly typed value
/// deserializes to `None` and is left for the consuming stage to deal with.
/// Numeric ids are kept in their decimal form.
pub trait StagePayload: Serialize + DeserializeOwned + Send + Sync + 'static {
	const QUEUE: QueueName;

	fn job_id(&self) -> Option<&JobId>;
}

fn lenient_job_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<JobId>, D::Error> {
	Ok(match Value::deserialize(deserializer)? {
		Value::String(id) => Some(JobId(id)),
		Value::Number(id) => Some(JobId(id.to_string())),
		_ => None,
	})
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
	Ok(match Value::deserialize(deserializer)? {
		Value::String(text) => Some(text),
		_ => None,
	})
}

/// Stage-1 input: the uploaded audio artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionJob {
	#[serde(default, deserialize_with = "lenient_job_id")]
	pub job_id: Option<JobId>,
	#[serde(default, deserialize_with = "lenient_text")]
	pub file_path: Option<String>,
}

impl TranscriptionJob {
	#[must_use]
	pub fn new(job_id: JobId, file_path: impl Into<String>) -> Self {
		Self {
			job_id: Some(job_id),
			file_path: Some(file_path.into()),
		}
	}
}

impl StagePayload for TranscriptionJob {
	const QUEUE: QueueName = QueueName::Transcription;

	fn job_id(&self) -> Option<&JobId> {
		self.job_id.as_ref()
	}
}

/// Stage-2 input: the transcript to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyJob {
	#[serde(default, deserialize_with = "lenient_job_id")]
	pub job_id: Option<JobId>,
	#[serde(default, deserialize_with = "lenient_text")]
	pub text_input: Option<String>,
}

impl ReplyJob {
	#[must_use]
	pub fn new(job_id: Option<JobId>, text_input: impl Into<String>) -> Self {
		Self {
			job_id,
			text_input: Some(text_input.into()),
		}
	}
}

impl StagePayload for ReplyJob {
	const QUEUE: QueueName = QueueName::Reply;

	fn job_id(&self) -> Option<&JobId> {
		self.job_id.as_ref()
	}
}

/// Stage-3 input: the reply text to speak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisJob {
	#[serde(default, deserialize_with = "lenient_job_id")]
	pub job_id: Option<JobId>,
	#[serde(default, deserialize_with = "lenient_text")]
	pub text_to_speech: Option<String>,
}

impl SynthesisJob {
	#[must_use]
	pub fn new(job_id: Option<JobId>, text_to_speech: impl Into<String>) -> Self {
		Self {
			job_id,
			text_to_speech: Some(text_to_speech.into()),
		}
	}
}

impl StagePayload for SynthesisJob {
	const QUEUE: QueueName = QueueName::Synthesis;

	fn job_id(&self) -> Option<&JobId> {
		self.job_id.as_ref()
	}
}

/// Any payload a producer can hand to the next stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageJob {
	Transcription(TranscriptionJob),
	Reply(ReplyJob),
	Synthesis(SynthesisJob),
}

impl StageJob {
	#[must_use]
	pub const fn queue(&self) -> QueueName {
		match self {
			Self::Transcription(_) => TranscriptionJob::QUEUE,
			Self::Reply(_) => ReplyJob::QUEUE,
			Self::Synthesis(_) => SynthesisJob::QUEUE,
		}
	}

	#[must_use]
	pub fn job_id(&self) -> Option<&JobId> {
		match self {
			Self::Transcription(job) => job.job_id(),
			Self::Reply(job) => job.job_id(),
			Self::Synthesis(job) => job.job_id(),
		}
	}

	/// Serializes the inner payload exactly as it is stored on the queue.
	///
	/// # Errors
	/// Returns an error if serialization fails.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		match self {
			Self::Transcription(job) => serde_json::to_string(job),
			Self::Reply(job) => serde_json::to_string(job),
			Self::Synthesis(job) => serde_json::to_string(job),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
	Pending,
	Completed,
	Failed,
}

/// What a terminal stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
	SynthesizedAudio(String),
	Transcript(String),
}

/// Terminal state of a job, stored once under `result:{job_id}`.
///
/// `Pending` records are never stored; readers synthesize them when the key
/// is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
	pub job_id: JobId,
	pub status: JobStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub final_audio_path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transcribed_text: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl ResultRecord {
	const fn bare(job_id: JobId, status: JobStatus) -> Self {
		Self {
			job_id,
			status,
			final_audio_path: None,
			transcribed_text: None,
			error: None,
		}
	}

	#[must_use]
	pub const fn pending(job_id: JobId) -> Self {
		Self::bare(job_id, JobStatus::Pending)
	}

	#[must_use]
	pub fn completed(job_id: JobId, output: JobOutput) -> Self {
		let mut record = Self::bare(job_id, JobStatus::Completed);
		match output {
			JobOutput::SynthesizedAudio(path) => record.final_audio_path = Some(path),
			JobOutput::Transcript(text) => record.transcribed_text = Some(text),
		}
		record
	}

	#[must_use]
	pub fn failed(job_id: JobId, error: impl Into<String>) -> Self {
		let mut record = Self::bare(job_id, JobStatus::Failed);
		record.error = Some(error.into());
		record
	}
}

/// Coarse position of a job in the pipeline, as far as the broker can tell.
///
/// A job popped by a worker and not yet handed on is invisible, so it reads
/// as `Unknown` just like an id that was never submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
	TranscriptionQueued,
	ReplyQueued,
	SynthesisQueued,
	Completed,
	Failed,
	Unknown,
}

impl From<QueueName> for JobPhase {
	fn from(queue: QueueName) -> Self {
		match queue {
			QueueName::Transcription => Self::TranscriptionQueued,
			QueueName::Reply => Self::ReplyQueued,
			QueueName::Synthesis => Self::SynthesisQueued,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_result_key_uses_fixed_prefix() {
		assert_eq!(JobId::from("J1").result_key(), "result:J1");
	}

	#[test]
	fn test_generated_ids_are_unique() {
		assert_ne!(JobId::new(), JobId::new());
	}

	#[test]
	fn test_queue_names_are_fixed() {
		let names: Vec<&str> = QueueName::ALL.iter().map(|q| q.as_str()).collect();
		assert_eq!(names, vec!["transcription_jobs", "llm_jobs", "tts_jobs"]);
	}

	#[test]
	fn test_completed_record_wire_shape() {
		let record = ResultRecord::completed("J1".into(), JobOutput::SynthesizedAudio("output/J1_response.wav".into()));
		assert_eq!(
			serde_json::to_value(&record).unwrap(),
			json!({"job_id": "J1", "status": "completed", "final_audio_path": "output/J1_response.wav"})
		);
	}

	#[test]
	fn test_failed_record_wire_shape() {
		let record = ResultRecord::failed("J2".into(), "quota exceeded");
		assert_eq!(serde_json::to_value(&record).unwrap(), json!({"job_id": "J2", "status": "failed", "error": "quota exceeded"}));
	}

	#[test]
	fn test_pending_record_wire_shape() {
		let record = ResultRecord::pending("unknown-id".into());
		assert_eq!(serde_json::to_value(&record).unwrap(), json!({"job_id": "unknown-id", "status": "pending"}));
	}

	#[test]
	fn test_payload_missing_fields_deserialize_to_none() {
		let job: ReplyJob = serde_json::from_str(r#"{"job_id": "J3"}"#).unwrap();
		assert_eq!(job.job_id(), Some(&JobId::from("J3")));
		assert!(job.text_input.is_none());

		let job: TranscriptionJob = serde_json::from_str("{}").unwrap();
		assert!(job.job_id().is_none());
	}

	#[test]
	fn test_wrongly_typed_fields_deserialize_leniently() {
		let job: TranscriptionJob = serde_json::from_str(r#"{"job_id": 42, "file_path": "uploads/42_a.wav"}"#).unwrap();
		assert_eq!(job.job_id(), Some(&JobId::from("42")));
		assert_eq!(job.file_path.as_deref(), Some("uploads/42_a.wav"));

		let job: ReplyJob = serde_json::from_str(r#"{"job_id": null, "text_input": ["not", "text"], "extra": true}"#).unwrap();
		assert!(job.job_id().is_none());
		assert!(job.text_input.is_none());
	}

	#[test]
	fn test_stage_job_routes_to_its_queue() {
		let job = StageJob::Synthesis(SynthesisJob::new(Some("J4".into()), "hi there"));
		assert_eq!(job.queue(), QueueName::Synthesis);
		assert_eq!(serde_json::from_str::<serde_json::Value>(&job.to_json().unwrap()).unwrap(), json!({"job_id": "J4", "text_to_speech": "hi there"}));
	}
}
