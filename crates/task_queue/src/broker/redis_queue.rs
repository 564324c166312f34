use super::Broker;
use crate::error::Result;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis-backed broker.
///
/// Queues are Redis lists fed with `LPUSH` and drained with `BRPOP`, so the
/// oldest payload always comes out first. Results are plain string keys.
#[derive(Clone)]
pub struct RedisBroker {
	conn: MultiplexedConnection,
}

impl RedisBroker {
	///
	/// # Errors
	/// This function returns an error if:
	/// - The URL is invalid
	/// - Redis connection fails
	pub async fn connect(redis_url: &str) -> Result<Self> {
		let client = Client::open(redis_url)?;
		let conn = client.get_multiplexed_async_connection().await?;
		Ok(Self { conn })
	}
}

#[async_trait::async_trait]
impl Broker for RedisBroker {
	async fn ping(&self) -> Result<()> {
		let mut conn = self.conn.clone();
		let _: String = redis::cmd("PING").query_async(&mut conn).await?;
		Ok(())
	}

	async fn push(&self, queue: &str, payload: String) -> Result<()> {
		let mut conn = self.conn.clone();
		let _: usize = conn.lpush(queue, payload).await?;
		Ok(())
	}

	async fn pop_blocking(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
		let mut conn = self.conn.clone();
		let popped: Option<(String, String)> = conn.brpop(queue, timeout.as_secs_f64()).await?;
		Ok(popped.map(|(_, payload)| payload))
	}

	async fn get(&self, key: &str) -> Result<Option<String>> {
		let mut conn = self.conn.clone();
		Ok(conn.get(key).await?)
	}

	async fn set(&self, key: &str, value: String) -> Result<()> {
		let mut conn = self.conn.clone();
		let _: () = conn.set(key, value).await?;
		Ok(())
	}

	async fn queue_len(&self, queue: &str) -> Result<usize> {
		let mut conn = self.conn.clone();
		Ok(conn.llen(queue).await?)
	}

	async fn peek(&self, queue: &str) -> Result<Vec<String>> {
		let mut conn = self.conn.clone();
		let mut payloads: Vec<String> = conn.lrange(queue, 0, -1).await?;
		// LPUSH puts the newest at index 0.
		payloads.reverse();
		Ok(payloads)
	}
}
