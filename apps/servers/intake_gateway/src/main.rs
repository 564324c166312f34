use anyhow::Result;
use clap::Parser;
use intake_gateway::{build_router, AppState, BrokerHandle, Config, GatewayMetrics, Intake};
use std::net::SocketAddr;
use task_queue::{connect_with_retry, init_tracing, shutdown_token};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	config.validate().map_err(anyhow::Error::msg)?;

	init_tracing(&config.telemetry)?;

	info!(upload_dir = %config.upload_dir.display(), "Starting intake gateway");

	let broker = match connect_with_retry(&config.broker).await {
		Ok(client) => BrokerHandle::Available(client),
		Err(e) => {
			warn!(error = %e, "Serving without a broker, submissions and status reads will return 503");
			BrokerHandle::Unavailable { reason: e.to_string() }
		}
	};

	let state = AppState::new(Intake::new(broker, config.upload_dir.clone()), GatewayMetrics::new()?);
	let app = build_router(state, config.max_upload_bytes());

	let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
	let listener = TcpListener::bind(addr).await?;
	info!(addr = %listener.local_addr()?, "Gateway listening");

	let shutdown = shutdown_token();
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			shutdown.cancelled().await;
		})
		.await?;

	info!("Gateway stopped");
	Ok(())
}
