//! Process plumbing shared by every binary: broker connection, signals and
//! the stage worker entry point.

use crate::broker::{BrokerClient, RedisBroker};
use crate::config::{BrokerArgs, WorkerArgs};
use crate::error::{QueueError, Result};
use crate::metrics::{serve_metrics, StageMetrics};
use crate::worker::{Stage, StageWorker};
use prometheus::Registry;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const INITIAL_BACKOFF_MS: u64 = 500;

/// Connects to Redis and verifies the connection with a ping, backing off
/// exponentially between attempts.
///
/// # Errors
/// Returns the last connection error once `connect_retries` attempts failed.
pub async fn connect_with_retry(args: &BrokerArgs) -> Result<BrokerClient> {
	let max_retries = args.connect_retries.max(1);
	let mut attempt = 1;

	loop {
		match connect_once(&args.redis_url).await {
			Ok(client) => {
				info!(url = %args.redis_url, "Connected to broker");
				return Ok(client);
			}
			Err(e) if attempt >= max_retries => {
				error!(
					error = %e,
					url = %args.redis_url,
					attempts = max_retries,
					"Failed to connect to broker, service cannot continue"
				);
				return Err(QueueError::Unavailable(e.to_string()));
			}
			Err(e) => {
				let backoff = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
				warn!(attempt, max_retries, backoff_ms = backoff, error = %e, "Broker connection failed, retrying...");
				tokio::time::sleep(Duration::from_millis(backoff)).await;
				attempt += 1;
			}
		}
	}
}

async fn connect_once(redis_url: &str) -> Result<BrokerClient> {
	let client = BrokerClient::new(RedisBroker::connect(redis_url).await?);
	client.ping().await?;
	Ok(client)
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn wait_for_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!(error = %e, "Failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				error!(error = %e, "Failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
}

/// A token cancelled when the process receives a shutdown signal.
#[must_use]
pub fn shutdown_token() -> CancellationToken {
	let token = CancellationToken::new();
	let signalled = token.clone();
	tokio::spawn(async move {
		wait_for_shutdown_signal().await;
		info!("Shutdown signal received");
		signalled.cancel();
	});
	token
}

/// Runs `stage` against `broker` until a shutdown signal arrives, serving
/// metrics on the side when a port is configured.
///
/// # Errors
/// This function returns an error if:
/// - The metrics counter cannot be registered
/// - The broker transport fails while the worker is running
pub async fn run_stage_worker<S: Stage>(stage: S, args: &WorkerArgs, broker: BrokerClient) -> Result<()> {
	let cancel = shutdown_token();
	let registry = Registry::new();
	let metrics = StageMetrics::register(&registry, stage.name())?;

	let metrics_server = args.metrics_port.map(|port| {
		let addr = SocketAddr::from(([0, 0, 0, 0], port));
		let token = cancel.child_token();
		tokio::spawn(async move {
			if let Err(e) = serve_metrics(addr, registry, token).await {
				error!(error = %e, "Metrics endpoint stopped");
			}
		})
	});

	let worker = StageWorker::new(broker, stage, args.poll_timeout).with_metrics(metrics);
	let result = worker.run(cancel.clone()).await;

	cancel.cancel();
	if let Some(handle) = metrics_server {
		let _ = handle.await;
	}

	if let Err(e) = &result {
		error!(error = %e, "Worker stopped on broker error");
	}
	result
}
