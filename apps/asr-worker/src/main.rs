mod config;
mod whisper;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use task_queue::{connect_with_retry, init_tracing, run_stage_worker, TranscriptionStage};
use tracing::info;

use config::Config;
use whisper::WhisperHttpClient;

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	config.validate().map_err(anyhow::Error::msg)?;

	init_tracing(&config.worker.telemetry)?;

	info!(
		asr_url = %config.asr_url,
		model = %config.asr_model,
		transcribe_only = config.transcribe_only,
		"Starting ASR worker"
	);

	let broker = connect_with_retry(&config.worker.broker).await?;
	let stt = WhisperHttpClient::new(config.asr_url.clone(), config.asr_model.clone(), config.asr_api_key.clone())?;
	let stage = TranscriptionStage::new(Arc::new(stt), config.mode());

	run_stage_worker(stage, &config.worker, broker).await?;
	info!("ASR worker stopped");
	Ok(())
}
