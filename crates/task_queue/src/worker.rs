use crate::artifact::ArtifactGuard;
use crate::broker::BrokerClient;
use crate::capability::ModelError;
use crate::error::Result;
use crate::job::{JobId, JobOutput, QueueName, ResultRecord, StageJob, StagePayload};
use crate::metrics::StageMetrics;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What a stage hands on after a successful capability call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
	/// Push this payload to the next stage's queue.
	Forward(StageJob),
	/// Write the completed result record; the pipeline ends here.
	Complete(JobOutput),
}

/// One step of the pipeline: consumes one queue, calls one capability.
#[async_trait::async_trait]
pub trait Stage: Send + Sync + 'static {
	type Input: StagePayload;

	fn name(&self) -> &'static str;

	/// A file this stage owns outright for the given job. It is deleted once
	/// `process` returns, whatever the outcome.
	fn owned_artifact(&self, _input: &Self::Input) -> Option<PathBuf> {
		None
	}

	async fn process(&self, job_id: Option<&JobId>, input: Self::Input) -> std::result::Result<Handoff, ModelError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
	Forwarded { job_id: Option<JobId>, queue: QueueName },
	Completed { job_id: JobId },
	Failed { job_id: Option<JobId>, error: String },
	Discarded { reason: String },
}

impl JobOutcome {
	#[must_use]
	pub const fn label(&self) -> &'static str {
		match self {
			Self::Forwarded { .. } => "forwarded",
			Self::Completed { .. } => "completed",
			Self::Failed { .. } => "failed",
			Self::Discarded { .. } => "discarded",
		}
	}
}

/// Sequential consumer of a single stage queue.
///
/// One job is taken, processed and handed on before the next pop. The only
/// place the loop waits is the bounded pop; capability calls run to
/// completion without a timeout.
pub struct StageWorker<S: Stage> {
	broker: BrokerClient,
	stage: S,
	poll_timeout: Duration,
	metrics: Option<StageMetrics>,
}

impl<S: Stage> StageWorker<S> {
	#[must_use]
	pub const fn new(broker: BrokerClient, stage: S, poll_timeout: Duration) -> Self {
		Self {
			broker,
			stage,
			poll_timeout,
			metrics: None,
		}
	}

	#[must_use]
	pub fn with_metrics(mut self, metrics: StageMetrics) -> Self {
		self.metrics = Some(metrics);
		self
	}

	/// Runs until `cancel` fires.
	///
	/// Cancellation is checked between pops and never interrupts one: a pop
	/// already sent to the broker may have taken a payload, so it is awaited
	/// and its job finished. The wait is bounded by the poll timeout.
	///
	/// # Errors
	/// Returns an error when the broker transport fails. Capability failures
	/// are recorded per job and never end the loop.
	pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
		let queue = S::Input::QUEUE;
		info!(stage = self.stage.name(), %queue, "Worker is listening for jobs");

		while !cancel.is_cancelled() {
			if let Some(body) = self.broker.pop_raw(queue, self.poll_timeout).await? {
				self.handle(&body).await?;
			}
		}

		info!(stage = self.stage.name(), "Worker shutting down");
		Ok(())
	}

	/// Waits for at most one payload and processes it.
	///
	/// # Errors
	/// Same as [`StageWorker::run`].
	pub async fn poll_once(&self) -> Result<Option<JobOutcome>> {
		match self.broker.pop_raw(S::Input::QUEUE, self.poll_timeout).await? {
			Some(body) => Ok(Some(self.handle(&body).await?)),
			None => Ok(None),
		}
	}

	/// Processes one raw queue payload.
	///
	/// # Errors
	/// Returns an error only when writing the handoff or the result fails.
	pub async fn handle(&self, body: &str) -> Result<JobOutcome> {
		let stage = self.stage.name();

		let input: S::Input = match serde_json::from_str::<Value>(body) {
			Ok(value @ Value::Object(_)) => match serde_json::from_value(value) {
				Ok(input) => input,
				Err(e) => {
					warn!(stage, error = %e, "Discarding unreadable payload");
					return Ok(self.record(JobOutcome::Discarded { reason: e.to_string() }));
				}
			},
			Ok(_) => {
				warn!(stage, "Discarding payload that is not a JSON object");
				return Ok(self.record(JobOutcome::Discarded {
					reason: "payload is not a JSON object".to_string(),
				}));
			}
			Err(e) => {
				warn!(stage, error = %e, "Discarding unreadable payload");
				return Ok(self.record(JobOutcome::Discarded { reason: e.to_string() }));
			}
		};

		let job_id = input.job_id().cloned();
		info!(stage, job_id = ?job_id, "Processing job");

		let result = {
			let _artifact = self.stage.owned_artifact(&input).map(ArtifactGuard::new);
			AssertUnwindSafe(self.stage.process(job_id.as_ref(), input))
				.catch_unwind()
				.await
				.unwrap_or_else(|panic| Err(ModelError::failed(panic_message(&*panic))))
		};

		let outcome = match result {
			Ok(Handoff::Forward(next)) => {
				let queue = next.queue();
				self.broker.push_job(&next).await?;
				info!(stage, job_id = ?job_id, %queue, "Job completed, pushed to next stage");
				JobOutcome::Forwarded { job_id, queue }
			}
			Ok(Handoff::Complete(output)) => match job_id {
				Some(job_id) => {
					self.broker.set_result(&ResultRecord::completed(job_id.clone(), output)).await?;
					info!(stage, %job_id, "Job completed, result stored");
					JobOutcome::Completed { job_id }
				}
				None => {
					warn!(stage, "Job finished without a job_id, result cannot be stored");
					JobOutcome::Discarded {
						reason: "missing job_id".to_string(),
					}
				}
			},
			Err(e) => {
				let error = e.to_string();
				if let Some(job_id) = &job_id {
					self.broker.set_result(&ResultRecord::failed(job_id.clone(), error.clone())).await?;
				}
				error!(stage, job_id = ?job_id, error = %error, "Job failed");
				JobOutcome::Failed { job_id, error }
			}
		};

		Ok(self.record(outcome))
	}

	fn record(&self, outcome: JobOutcome) -> JobOutcome {
		if let Some(metrics) = &self.metrics {
			metrics.record(outcome.label());
		}
		outcome
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	let detail = panic
		.downcast_ref::<&str>()
		.map(|s| (*s).to_string())
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic".to_string());
	format!("stage panicked: {detail}")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::broker::{Broker, InMemBroker};
	use crate::job::{JobStatus, ReplyJob, SynthesisJob};
	use prometheus::Registry;

	/// Upper-cases its input, fails on "fail", panics on "panic".
	struct EchoStage;

	#[async_trait::async_trait]
	impl Stage for EchoStage {
		type Input = ReplyJob;

		fn name(&self) -> &'static str {
			"echo"
		}

		async fn process(&self, job_id: Option<&JobId>, input: ReplyJob) -> std::result::Result<Handoff, ModelError> {
			let text = input.text_input.ok_or(ModelError::MissingInput("text_input"))?;
			match text.as_str() {
				"fail" => Err(ModelError::failed("quota exceeded")),
				"panic" => panic!("model crashed"),
				_ => Ok(Handoff::Forward(StageJob::Synthesis(SynthesisJob::new(job_id.cloned(), text.to_uppercase())))),
			}
		}
	}

	fn worker() -> (BrokerClient, StageWorker<EchoStage>) {
		let broker = BrokerClient::new(InMemBroker::new());
		let worker = StageWorker::new(broker.clone(), EchoStage, Duration::from_millis(20));
		(broker, worker)
	}

	#[tokio::test]
	async fn test_success_forwards_with_same_job_id() -> Result<()> {
		let (broker, worker) = worker();
		let outcome = worker.handle(r#"{"job_id":"J1","text_input":"hello"}"#).await?;

		assert_eq!(
			outcome,
			JobOutcome::Forwarded {
				job_id: Some("J1".into()),
				queue: QueueName::Synthesis
			}
		);
		let forwarded = broker.pop_raw(QueueName::Synthesis, Duration::from_millis(10)).await?.unwrap_or_default();
		let next: SynthesisJob = serde_json::from_str(&forwarded)?;
		assert_eq!(next, SynthesisJob::new(Some("J1".into()), "HELLO"));
		Ok(())
	}

	#[tokio::test]
	async fn test_failure_writes_terminal_record_and_skips_next_stage() -> Result<()> {
		let (broker, worker) = worker();
		worker.handle(r#"{"job_id":"J2","text_input":"fail"}"#).await?;

		let record = broker.status(&"J2".into()).await?;
		assert_eq!(record, ResultRecord::failed("J2".into(), "quota exceeded"));
		assert_eq!(broker.queue_len(QueueName::Synthesis).await?, 0);
		Ok(())
	}

	#[tokio::test]
	async fn test_missing_field_is_a_job_failure() -> Result<()> {
		let (broker, worker) = worker();
		worker.handle(r#"{"job_id":"J3"}"#).await?;

		let record = broker.status(&"J3".into()).await?;
		assert_eq!(record.status, JobStatus::Failed);
		assert_eq!(record.error.as_deref(), Some("job payload is missing `text_input`"));
		Ok(())
	}

	#[tokio::test]
	async fn test_panicking_stage_does_not_crash_worker() -> Result<()> {
		let (broker, worker) = worker();
		let outcome = worker.handle(r#"{"job_id":"J4","text_input":"panic"}"#).await?;

		assert_eq!(outcome.label(), "failed");
		let record = broker.status(&"J4".into()).await?;
		assert_eq!(record.error.as_deref(), Some("stage panicked: model crashed"));
		Ok(())
	}

	#[tokio::test]
	async fn test_failure_without_job_id_is_only_logged() -> Result<()> {
		let (broker, worker) = worker();
		let outcome = worker.handle(r#"{"text_input":"fail"}"#).await?;

		assert_eq!(
			outcome,
			JobOutcome::Failed {
				job_id: None,
				error: "quota exceeded".to_string()
			}
		);
		assert_eq!(broker.queue_len(QueueName::Synthesis).await?, 0);
		Ok(())
	}

	#[tokio::test]
	async fn test_unreadable_payload_is_discarded() -> Result<()> {
		let (_, worker) = worker();
		let outcome = worker.handle("not json").await?;
		assert_eq!(outcome.label(), "discarded");
		Ok(())
	}

	#[tokio::test]
	async fn test_non_object_payload_is_discarded() -> Result<()> {
		let (broker, worker) = worker();
		let outcome = worker.handle(r#"["J1", "hello"]"#).await?;

		assert_eq!(
			outcome,
			JobOutcome::Discarded {
				reason: "payload is not a JSON object".to_string()
			}
		);
		assert_eq!(broker.queue_len(QueueName::Synthesis).await?, 0);
		Ok(())
	}

	#[tokio::test]
	async fn test_numeric_job_id_is_processed() -> Result<()> {
		let (broker, worker) = worker();
		let outcome = worker.handle(r#"{"job_id": 42, "text_input": "fail"}"#).await?;

		assert_eq!(outcome.label(), "failed");
		assert_eq!(broker.status(&"42".into()).await?, ResultRecord::failed("42".into(), "quota exceeded"));
		Ok(())
	}

	#[tokio::test]
	async fn test_poll_once_times_out_quietly() -> Result<()> {
		let (_, worker) = worker();
		assert!(worker.poll_once().await?.is_none());
		Ok(())
	}

	#[tokio::test]
	async fn test_run_stops_on_cancel() -> Result<()> {
		let (broker, worker) = worker();
		let cancel = CancellationToken::new();
		broker.push_job(&StageJob::Reply(ReplyJob::new(Some("J5".into()), "hi"))).await?;

		let stopper = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(100)).await;
			stopper.cancel();
		});
		worker.run(cancel).await?;

		assert_eq!(broker.queue_len(QueueName::Reply).await?, 0);
		assert_eq!(broker.queue_len(QueueName::Synthesis).await?, 1);
		Ok(())
	}

	/// Takes the payload at once, then keeps the pop open for `hold`.
	struct SlowReplyBroker {
		inner: InMemBroker,
		hold: Duration,
	}

	#[async_trait::async_trait]
	impl Broker for SlowReplyBroker {
		async fn ping(&self) -> Result<()> {
			self.inner.ping().await
		}

		async fn push(&self, queue: &str, payload: String) -> Result<()> {
			self.inner.push(queue, payload).await
		}

		async fn pop_blocking(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
			let popped = self.inner.pop_blocking(queue, timeout).await?;
			tokio::time::sleep(self.hold).await;
			Ok(popped)
		}

		async fn get(&self, key: &str) -> Result<Option<String>> {
			self.inner.get(key).await
		}

		async fn set(&self, key: &str, value: String) -> Result<()> {
			self.inner.set(key, value).await
		}

		async fn queue_len(&self, queue: &str) -> Result<usize> {
			self.inner.queue_len(queue).await
		}

		async fn peek(&self, queue: &str) -> Result<Vec<String>> {
			self.inner.peek(queue).await
		}
	}

	#[tokio::test]
	async fn test_cancel_during_pop_still_finishes_taken_job() -> Result<()> {
		let inmem = InMemBroker::new();
		let broker = BrokerClient::new(SlowReplyBroker {
			inner: inmem.clone(),
			hold: Duration::from_millis(200),
		});
		let worker = StageWorker::new(broker.clone(), EchoStage, Duration::from_millis(20));
		broker.push_job(&StageJob::Reply(ReplyJob::new(Some("J8".into()), "late"))).await?;

		let cancel = CancellationToken::new();
		let stopper = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(50)).await;
			stopper.cancel();
		});
		worker.run(cancel).await?;

		assert_eq!(broker.queue_len(QueueName::Reply).await?, 0);
		let forwarded = broker.pop_raw(QueueName::Synthesis, Duration::from_millis(10)).await?.unwrap_or_default();
		let next: SynthesisJob = serde_json::from_str(&forwarded)?;
		assert_eq!(next, SynthesisJob::new(Some("J8".into()), "LATE"));
		Ok(())
	}

	#[tokio::test]
	async fn test_broker_loss_ends_the_loop() {
		let inmem = InMemBroker::new();
		let worker = StageWorker::new(BrokerClient::new(inmem.clone()), EchoStage, Duration::from_millis(20));
		inmem.set_offline(true);

		assert!(worker.run(CancellationToken::new()).await.is_err());
	}

	#[tokio::test]
	async fn test_outcomes_are_counted() -> Result<()> {
		let registry = Registry::new();
		let metrics = StageMetrics::register(&registry, "echo")?;
		let (_, worker) = worker();
		let worker = worker.with_metrics(metrics.clone());

		worker.handle(r#"{"job_id":"J6","text_input":"ok"}"#).await?;
		worker.handle(r#"{"job_id":"J7","text_input":"fail"}"#).await?;

		assert_eq!(metrics.count("forwarded"), 1);
		assert_eq!(metrics.count("failed"), 1);
		Ok(())
	}
}
