mod config;
mod fallback;
mod gemini;
mod openai;
mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use task_queue::{connect_with_retry, init_tracing, run_stage_worker, ReplyGenerator, ReplyStage};
use tracing::info;

use config::{Config, Provider};
use fallback::FallbackReply;
use gemini::GeminiClient;
use openai::ChatCompletionsClient;

fn build_generator(config: &Config) -> Result<Arc<dyn ReplyGenerator>> {
	let generator: Arc<dyn ReplyGenerator> = match config.provider {
		Provider::Gemini => {
			let key = config.gemini_api_key.clone().context("GEMINI_API_KEY is not set")?;
			Arc::new(GeminiClient::new(config.gemini_base_url.clone(), config.model.clone(), key)?)
		}
		Provider::Openai => Arc::new(ChatCompletionsClient::new(config.openai_base_url.clone(), config.model.clone(), config.openai_api_key.clone())?),
	};

	Ok(match &config.fallback_reply {
		Some(reply) => Arc::new(FallbackReply::new(generator, reply.clone())),
		None => generator,
	})
}

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	config.validate().map_err(anyhow::Error::msg)?;

	init_tracing(&config.worker.telemetry)?;

	info!(
		provider = ?config.provider,
		model = %config.model,
		fallback = config.fallback_reply.is_some(),
		"Starting LLM worker"
	);

	let broker = connect_with_retry(&config.worker.broker).await?;
	let stage = ReplyStage::new(build_generator(&config)?);

	run_stage_worker(stage, &config.worker, broker).await?;
	info!("LLM worker stopped");
	Ok(())
}
