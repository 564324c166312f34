use super::Broker;
use crate::error::{QueueError, Result};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// In-process broker with the same queue and result semantics as Redis.
///
/// Used by tests and single-process runs. Clones share state. The broker can
/// be switched offline to simulate transport loss: every operation then fails
/// with [`QueueError::Unavailable`].
#[derive(Clone, Default)]
pub struct InMemBroker {
	state: Arc<InMemState>,
}

#[derive(Default)]
struct InMemState {
	queues: DashMap<String, VecDeque<String>>,
	values: DashMap<String, String>,
	pushed: Notify,
	offline: AtomicBool,
}

impl InMemBroker {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_offline(&self, offline: bool) {
		self.state.offline.store(offline, Ordering::SeqCst);
		// Wake blocked consumers so they observe the change.
		self.state.pushed.notify_waiters();
	}

	fn ensure_online(&self) -> Result<()> {
		if self.state.offline.load(Ordering::SeqCst) {
			return Err(QueueError::Unavailable("in-memory broker is offline".to_string()));
		}
		Ok(())
	}

	fn try_pop(&self, queue: &str) -> Option<String> {
		self.state.queues.get_mut(queue).and_then(|mut items| items.pop_front())
	}
}

#[async_trait::async_trait]
impl Broker for InMemBroker {
	async fn ping(&self) -> Result<()> {
		self.ensure_online()
	}

	async fn push(&self, queue: &str, payload: String) -> Result<()> {
		self.ensure_online()?;
		self.state.queues.entry(queue.to_string()).or_default().push_back(payload);
		self.state.pushed.notify_waiters();
		Ok(())
	}

	async fn pop_blocking(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
		let deadline = tokio::time::Instant::now() + timeout;

		loop {
			// Register interest before checking so a push in between is not missed.
			let pushed = self.state.pushed.notified();
			tokio::pin!(pushed);
			pushed.as_mut().enable();

			self.ensure_online()?;
			if let Some(payload) = self.try_pop(queue) {
				return Ok(Some(payload));
			}

			if tokio::time::timeout_at(deadline, pushed).await.is_err() {
				return Ok(None);
			}
		}
	}

	async fn get(&self, key: &str) -> Result<Option<String>> {
		self.ensure_online()?;
		Ok(self.state.values.get(key).map(|value| value.clone()))
	}

	async fn set(&self, key: &str, value: String) -> Result<()> {
		self.ensure_online()?;
		self.state.values.insert(key.to_string(), value);
		Ok(())
	}

	async fn queue_len(&self, queue: &str) -> Result<usize> {
		self.ensure_online()?;
		Ok(self.state.queues.get(queue).map_or(0, |items| items.len()))
	}

	async fn peek(&self, queue: &str) -> Result<Vec<String>> {
		self.ensure_online()?;
		Ok(self.state.queues.get(queue).map(|items| items.iter().cloned().collect()).unwrap_or_default())
	}
}
