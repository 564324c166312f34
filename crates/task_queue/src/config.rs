//! Command-line fragments shared by the gateway and the stage workers.
//!
//! Each binary flattens the fragments it needs into its own `Parser`.

use crate::error::{QueueError, Result};
use clap::Args;
use std::time::Duration;

#[derive(Args, Clone, Debug)]
pub struct BrokerArgs {
	/// Redis connection URL
	#[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
	pub redis_url: String,

	/// Connection attempts before giving up at startup
	#[arg(long, env = "BROKER_CONNECT_RETRIES", default_value = "5")]
	pub connect_retries: u32,
}

#[derive(Args, Clone, Debug)]
pub struct TelemetryArgs {
	/// Emit logs as JSON instead of pretty text
	#[arg(long, env = "LOG_JSON", default_value_t = false)]
	pub log_json: bool,

	/// Tracing filter directive, e.g. `info,task_queue=debug`
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct WorkerArgs {
	#[command(flatten)]
	pub broker: BrokerArgs,

	#[command(flatten)]
	pub telemetry: TelemetryArgs,

	#[arg(
        long = "poll-timeout-secs",
        env = "POLL_TIMEOUT_SECS",
        default_value = "1",
        value_parser = parse_duration,
        help = "Upper bound of a single blocking pop, in seconds"
    )]
	pub poll_timeout: Duration,

	/// Port for the Prometheus endpoint; disabled when unset
	#[arg(long, env = "METRICS_PORT")]
	pub metrics_port: Option<u16>,
}

impl BrokerArgs {
	///
	/// # Errors
	/// Returns an error if the URL is empty or no connection attempt is allowed.
	pub fn validate(&self) -> Result<()> {
		if self.redis_url.trim().is_empty() {
			return Err(QueueError::InvalidConfig("redis_url must not be empty".to_string()));
		}

		if self.connect_retries == 0 {
			return Err(QueueError::InvalidConfig("connect_retries must be at least 1".to_string()));
		}

		Ok(())
	}
}

impl WorkerArgs {
	///
	/// # Errors
	/// Returns an error if any value is out of range.
	pub fn validate(&self) -> Result<()> {
		self.broker.validate()?;

		if self.poll_timeout.is_zero() {
			// BRPOP treats 0 as "block forever".
			return Err(QueueError::InvalidConfig("poll_timeout must be greater than 0".to_string()));
		}

		if self.metrics_port == Some(0) {
			return Err(QueueError::InvalidConfig("metrics_port must be greater than 0".to_string()));
		}

		Ok(())
	}
}

/// Parses whole seconds.
///
/// # Errors
/// Returns an error if `s` is not an unsigned integer.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, std::num::ParseIntError> {
	s.parse::<u64>().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	#[derive(Parser)]
	struct TestCli {
		#[command(flatten)]
		worker: WorkerArgs,
	}

	#[test]
	fn test_parse_duration() {
		assert_eq!(parse_duration("60").unwrap(), Duration::from_secs(60));
		assert!(parse_duration("invalid").is_err());
	}

	#[test]
	fn test_worker_args_parser() {
		let args = vec![
			"program",
			"--redis-url",
			"redis://broker:6379",
			"--poll-timeout-secs",
			"3",
			"--metrics-port",
			"9100",
			"--log-json",
		];

		let cli = TestCli::try_parse_from(args).unwrap();
		assert_eq!(cli.worker.broker.redis_url, "redis://broker:6379");
		assert_eq!(cli.worker.poll_timeout, Duration::from_secs(3));
		assert_eq!(cli.worker.metrics_port, Some(9100));
		assert!(cli.worker.telemetry.log_json);
		assert!(cli.worker.validate().is_ok());
	}

	#[test]
	fn test_zero_poll_timeout_is_rejected() {
		let cli = TestCli::try_parse_from(["program", "--redis-url", "redis://x", "--poll-timeout-secs", "0"]).unwrap();
		assert!(matches!(cli.worker.validate(), Err(QueueError::InvalidConfig(_))));
	}
}
