//! Broker-mediated job pipeline for voice requests.
//!
//! An uploaded audio file travels `transcription_jobs` -> `llm_jobs` ->
//! `tts_jobs`, one independent worker per queue. The terminal record of each
//! job is written under `result:{job_id}`.

pub mod artifact;
pub mod broker;
pub mod capability;
pub mod config;
pub mod error;
pub mod job;
pub mod metrics;
pub mod runtime;
pub mod stages;
pub mod telemetry;
pub mod worker;

pub use broker::{Broker, BrokerClient, InMemBroker, RedisBroker};
pub use capability::{ModelError, ReplyGenerator, SpeechSynthesizer, SpeechToText};
pub use config::{BrokerArgs, TelemetryArgs, WorkerArgs};
pub use error::{QueueError, Result};
pub use job::{JobId, JobOutput, JobPhase, JobStatus, QueueName, ReplyJob, ResultRecord, StageJob, StagePayload, SynthesisJob, TranscriptionJob};
pub use runtime::{connect_with_retry, run_stage_worker, shutdown_token, wait_for_shutdown_signal};
pub use stages::{ReplyStage, SynthesisStage, TranscriptionMode, TranscriptionStage};
pub use telemetry::init_tracing;
pub use worker::{Handoff, JobOutcome, Stage, StageWorker};
