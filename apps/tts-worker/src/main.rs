mod config;
mod synthesizer;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use task_queue::{connect_with_retry, init_tracing, run_stage_worker, SynthesisStage};
use tracing::info;

use config::Config;
use synthesizer::HttpSynthesizer;

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	config.validate().map_err(anyhow::Error::msg)?;

	init_tracing(&config.worker.telemetry)?;

	info!(
		tts_url = %config.tts_url,
		output_dir = %config.output_dir.display(),
		"Starting TTS worker"
	);

	let broker = connect_with_retry(&config.worker.broker).await?;
	let tts = HttpSynthesizer::new(config.tts_url.clone(), config.voice_description.clone())?;
	let stage = SynthesisStage::new(Arc::new(tts), config.output_dir.clone(), config.output_extension.clone());

	run_stage_worker(stage, &config.worker, broker).await?;
	info!("TTS worker stopped");
	Ok(())
}
