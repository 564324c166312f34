use crate::config::TelemetryArgs;
use crate::error::{QueueError, Result};
use std::str::FromStr;
use tracing_subscriber::{filter::EnvFilter, fmt::format::JsonFields, layer::SubscriberExt, util::SubscriberInitExt, Layer};

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber: pretty text by default, flattened JSON
/// events with `--log-json`.
///
/// # Errors
/// This function returns an error if:
/// - The filter directive does not parse
/// - A global subscriber is already installed
pub fn init_tracing(args: &TelemetryArgs) -> Result<()> {
	let directive = args.rust_log.as_deref().unwrap_or(DEFAULT_FILTER);
	let filter = EnvFilter::from_str(directive).map_err(|e| QueueError::InvalidConfig(format!("invalid log filter `{directive}`: {e}")))?;

	tracing_subscriber::registry()
		.with(if args.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(
				tracing_subscriber::fmt::layer()
					.event_format(tracing_subscriber::fmt::format().pretty())
					.with_filter(filter),
			)
		})
		.try_init()
		.map_err(|e| QueueError::InternalError(e.to_string()))
}
