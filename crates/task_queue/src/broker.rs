//! Broker abstraction: list queues plus a key/value result store.
//!
//! `Broker` is the raw string-keyed contract; `BrokerClient` layers the job
//! model on top of it so callers never hand-build keys or payloads.

mod inmem;
mod redis_queue;

pub use inmem::InMemBroker;
pub use redis_queue::RedisBroker;

use crate::error::Result;
use crate::job::{JobId, JobPhase, JobStatus, QueueName, ResultRecord, StageJob};
use std::sync::Arc;
use std::time::Duration;

#[async_trait::async_trait]
pub trait Broker: Send + Sync + 'static {
	/// Connectivity probe, used once at process start.
	async fn ping(&self) -> Result<()>;

	/// Appends a payload to the tail of `queue`.
	async fn push(&self, queue: &str, payload: String) -> Result<()>;

	/// Removes and returns the oldest payload of `queue`, waiting up to
	/// `timeout`. `None` means the wait elapsed with nothing to take.
	async fn pop_blocking(&self, queue: &str, timeout: Duration) -> Result<Option<String>>;

	async fn get(&self, key: &str) -> Result<Option<String>>;

	/// Unconditional overwrite.
	async fn set(&self, key: &str, value: String) -> Result<()>;

	async fn queue_len(&self, queue: &str) -> Result<usize>;

	/// Snapshot of a queue's payloads, oldest first, without removing them.
	async fn peek(&self, queue: &str) -> Result<Vec<String>>;
}

/// Typed handle over a shared broker connection.
#[derive(Clone)]
pub struct BrokerClient {
	inner: Arc<dyn Broker>,
}

impl BrokerClient {
	#[must_use]
	pub fn new<B: Broker>(broker: B) -> Self {
		Self { inner: Arc::new(broker) }
	}

	///
	/// # Errors
	/// Returns an error if the broker cannot be reached.
	pub async fn ping(&self) -> Result<()> {
		self.inner.ping().await
	}

	///
	/// # Errors
	/// This function returns an error if:
	/// - Serialization fails
	/// - The broker transport fails
	pub async fn push_job(&self, job: &StageJob) -> Result<()> {
		let payload = job.to_json()?;
		self.inner.push(job.queue().as_str(), payload).await
	}

	///
	/// # Errors
	/// Returns an error if the broker transport fails.
	pub async fn pop_raw(&self, queue: QueueName, timeout: Duration) -> Result<Option<String>> {
		self.inner.pop_blocking(queue.as_str(), timeout).await
	}

	///
	/// # Errors
	/// This function returns an error if:
	/// - The broker transport fails
	/// - The stored record is not valid JSON
	pub async fn get_result(&self, job_id: &JobId) -> Result<Option<ResultRecord>> {
		match self.inner.get(&job_id.result_key()).await? {
			Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
			None => Ok(None),
		}
	}

	/// Last writer wins.
	///
	/// # Errors
	/// This function returns an error if:
	/// - Serialization fails
	/// - The broker transport fails
	pub async fn set_result(&self, record: &ResultRecord) -> Result<()> {
		let value = serde_json::to_string(record)?;
		self.inner.set(&record.job_id.result_key(), value).await
	}

	/// The stored record, or a synthesized pending one when none exists.
	///
	/// An id that was never submitted is indistinguishable from a job still
	/// in flight.
	///
	/// # Errors
	/// Same as [`BrokerClient::get_result`].
	pub async fn status(&self, job_id: &JobId) -> Result<ResultRecord> {
		Ok(self.get_result(job_id).await?.unwrap_or_else(|| ResultRecord::pending(job_id.clone())))
	}

	///
	/// # Errors
	/// Returns an error if the broker transport fails.
	pub async fn queue_len(&self, queue: QueueName) -> Result<usize> {
		self.inner.queue_len(queue.as_str()).await
	}

	/// Finds where a job sits by checking the result store, then scanning
	/// every stage queue for a payload carrying its id.
	///
	/// # Errors
	/// Same as [`BrokerClient::get_result`].
	pub async fn locate(&self, job_id: &JobId) -> Result<JobPhase> {
		if let Some(record) = self.get_result(job_id).await? {
			return Ok(match record.status {
				JobStatus::Completed => JobPhase::Completed,
				JobStatus::Failed => JobPhase::Failed,
				JobStatus::Pending => JobPhase::Unknown,
			});
		}

		for queue in QueueName::ALL {
			let payloads = self.inner.peek(queue.as_str()).await?;
			if payloads.iter().any(|raw| payload_job_id(raw).as_deref() == Some(job_id.as_str())) {
				return Ok(queue.into());
			}
		}

		Ok(JobPhase::Unknown)
	}
}

fn payload_job_id(raw: &str) -> Option<String> {
	let value: serde_json::Value = serde_json::from_str(raw).ok()?;
	value.get("job_id")?.as_str().map(str::to_string)
}
