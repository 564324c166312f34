use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
	#[error("Broker unavailable: {0}")]
	Unavailable(String),
	#[error("Redis error: {0}")]
	RedisError(#[from] redis::RedisError),
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),
	#[error("I/O error: {0}")]
	IoError(#[from] std::io::Error),
	#[error("Prometheus error: {0}")]
	PrometheusError(#[from] prometheus::Error),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("Internal error: {0}")]
	InternalError(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
