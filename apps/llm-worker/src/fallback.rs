use std::sync::Arc;
use task_queue::{ModelError, ReplyGenerator};
use tracing::warn;

/// Replaces a failed generation with a fixed reply so the job still gets
/// spoken back.
pub struct FallbackReply {
	inner: Arc<dyn ReplyGenerator>,
	reply: String,
}

impl FallbackReply {
	#[must_use]
	pub fn new(inner: Arc<dyn ReplyGenerator>, reply: impl Into<String>) -> Self {
		Self { inner, reply: reply.into() }
	}
}

#[async_trait::async_trait]
impl ReplyGenerator for FallbackReply {
	async fn generate(&self, text: &str) -> Result<String, ModelError> {
		match self.inner.generate(text).await {
			Ok(reply) => Ok(reply),
			Err(e) => {
				warn!(error = %e, "Reply generation failed, using fallback reply");
				Ok(self.reply.clone())
			}
		}
	}
}
