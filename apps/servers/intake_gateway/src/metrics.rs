use prometheus::{IntCounter, Registry};

/// Gateway counters, registered on a registry owned by the app state.
#[derive(Clone)]
pub struct GatewayMetrics {
	pub registry: Registry,
	pub jobs_submitted: IntCounter,
	pub submissions_failed: IntCounter,
	pub status_reads: IntCounter,
}

impl GatewayMetrics {
	///
	/// # Errors
	/// Returns an error if a counter cannot be created or registered.
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();
		let jobs_submitted = IntCounter::new("gateway_jobs_submitted_total", "Jobs accepted and pushed to transcription_jobs")?;
		let submissions_failed = IntCounter::new("gateway_submissions_failed_total", "Uploads rejected or rolled back")?;
		let status_reads = IntCounter::new("gateway_status_reads_total", "Status and locate reads served")?;

		registry.register(Box::new(jobs_submitted.clone()))?;
		registry.register(Box::new(submissions_failed.clone()))?;
		registry.register(Box::new(status_reads.clone()))?;

		Ok(Self {
			registry,
			jobs_submitted,
			submissions_failed,
			status_reads,
		})
	}
}
