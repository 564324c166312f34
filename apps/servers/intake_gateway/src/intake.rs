use crate::error::GatewayError;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use task_queue::artifact::input_artifact_path;
use task_queue::{BrokerClient, JobId, JobPhase, ResultRecord, StageJob, TranscriptionJob};
use tracing::{info, instrument, warn};

/// The gateway's view of the broker.
///
/// A gateway that failed to connect at startup keeps serving and answers
/// every broker-backed request with 503.
#[derive(Clone)]
pub enum BrokerHandle {
	Available(BrokerClient),
	Unavailable { reason: String },
}

impl BrokerHandle {
	///
	/// # Errors
	/// Returns [`GatewayError::BrokerUnavailable`] for the `Unavailable` variant.
	pub fn client(&self) -> Result<&BrokerClient, GatewayError> {
		match self {
			Self::Available(client) => Ok(client),
			Self::Unavailable { reason } => Err(GatewayError::BrokerUnavailable(reason.clone())),
		}
	}
}

/// Intake and status operations, independent of HTTP.
pub struct Intake {
	broker: BrokerHandle,
	upload_dir: PathBuf,
}

impl Intake {
	#[must_use]
	pub fn new(broker: BrokerHandle, upload_dir: impl Into<PathBuf>) -> Self {
		Self {
			broker,
			upload_dir: upload_dir.into(),
		}
	}

	/// Stores the upload and enqueues it for transcription.
	///
	/// Returns as soon as the job is on the queue. On any failure after the
	/// file was created, the file is removed again.
	///
	/// # Errors
	/// This function returns an error if:
	/// - The broker is unavailable
	/// - The artifact cannot be written
	/// - The push to `transcription_jobs` fails
	#[instrument(skip(self, bytes), fields(size = bytes.len()))]
	pub async fn submit(&self, file_name: &str, bytes: Bytes) -> Result<JobId, GatewayError> {
		let broker = self.broker.client()?;
		let job_id = JobId::new();
		let path = input_artifact_path(&self.upload_dir, &job_id, file_name);

		if let Err(e) = write_artifact(&path, &bytes).await {
			remove_partial(&path).await;
			return Err(GatewayError::Submission(e.to_string()));
		}

		let job = StageJob::Transcription(TranscriptionJob::new(job_id.clone(), path.display().to_string()));
		if let Err(e) = broker.push_job(&job).await {
			remove_partial(&path).await;
			return Err(GatewayError::Submission(e.to_string()));
		}

		info!(%job_id, path = %path.display(), "Transcription job submitted");
		Ok(job_id)
	}

	/// The stored record, or a pending one.
	///
	/// # Errors
	/// Returns an error if the broker is unavailable or the read fails.
	pub async fn status(&self, job_id: &JobId) -> Result<ResultRecord, GatewayError> {
		Ok(self.broker.client()?.status(job_id).await?)
	}

	///
	/// # Errors
	/// Returns an error if the broker is unavailable or a read fails.
	pub async fn locate(&self, job_id: &JobId) -> Result<JobPhase, GatewayError> {
		Ok(self.broker.client()?.locate(job_id).await?)
	}
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
	if let Some(parent) = path.parent() {
		tokio::fs::create_dir_all(parent).await?;
	}
	tokio::fs::write(path, bytes).await
}

async fn remove_partial(path: &Path) {
	match tokio::fs::remove_file(path).await {
		Ok(()) => info!(path = %path.display(), "Rolled back upload"),
		Err(e) if e.kind() == ErrorKind::NotFound => {}
		Err(e) => warn!(path = %path.display(), error = %e, "Failed to roll back upload"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use task_queue::{InMemBroker, JobStatus, QueueName};

	#[tokio::test]
	async fn test_submit_writes_file_and_enqueues() -> anyhow::Result<()> {
		let dir = tempfile::tempdir()?;
		let broker = BrokerClient::new(InMemBroker::new());
		let intake = Intake::new(BrokerHandle::Available(broker.clone()), dir.path());

		let job_id = intake.submit("a.wav", Bytes::from_static(b"RIFF")).await?;

		let expected = dir.path().join(format!("{job_id}_a.wav"));
		assert_eq!(std::fs::read(&expected)?, b"RIFF");

		let raw = broker.pop_raw(QueueName::Transcription, Duration::from_millis(10)).await?.unwrap_or_default();
		let job: TranscriptionJob = serde_json::from_str(&raw)?;
		assert_eq!(job, TranscriptionJob::new(job_id.clone(), expected.display().to_string()));
		assert_eq!(intake.status(&job_id).await?.status, JobStatus::Pending);
		Ok(())
	}

	#[tokio::test]
	async fn test_failed_push_rolls_back_file() -> anyhow::Result<()> {
		let dir = tempfile::tempdir()?;
		let inmem = InMemBroker::new();
		let intake = Intake::new(BrokerHandle::Available(BrokerClient::new(inmem.clone())), dir.path());
		inmem.set_offline(true);

		let result = intake.submit("a.wav", Bytes::from_static(b"RIFF")).await;

		assert!(matches!(result, Err(GatewayError::Submission(_))));
		assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
		Ok(())
	}

	#[tokio::test]
	async fn test_unavailable_broker_writes_nothing() -> anyhow::Result<()> {
		let dir = tempfile::tempdir()?;
		let intake = Intake::new(
			BrokerHandle::Unavailable {
				reason: "connection refused".to_string(),
			},
			dir.path(),
		);

		assert!(matches!(intake.submit("a.wav", Bytes::new()).await, Err(GatewayError::BrokerUnavailable(_))));
		assert!(matches!(intake.status(&"J1".into()).await, Err(GatewayError::BrokerUnavailable(_))));
		assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
		Ok(())
	}

	#[tokio::test]
	async fn test_unwritable_upload_dir_is_a_submission_error() -> anyhow::Result<()> {
		let dir = tempfile::tempdir()?;
		let blocker = dir.path().join("not_a_dir");
		std::fs::write(&blocker, b"")?;
		let broker = BrokerClient::new(InMemBroker::new());
		let intake = Intake::new(BrokerHandle::Available(broker.clone()), &blocker);

		assert!(matches!(intake.submit("a.wav", Bytes::new()).await, Err(GatewayError::Submission(_))));
		assert_eq!(broker.queue_len(QueueName::Transcription).await?, 0);
		Ok(())
	}
}
