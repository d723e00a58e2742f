//! # Redis Queue Backend
//!
//! Queue backed by a Redis list: `RPUSH` to enqueue, `BLPOP` to dequeue.
//!
//! Every wait is a loop of `BLPOP` calls of at most `poll_interval` each, so
//! no single request outlives the client's response timeout and a blocked
//! listener still gets a chance to observe a dropped connection.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::errors::{MessagingError, MessagingResult};
use super::queue::QueueBackend;

/// Headroom added on top of the blocking window before the client gives up
const RESPONSE_TIMEOUT_SLACK: Duration = Duration::from_secs(5);
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// One named Redis list
///
/// Push and pop use separate connections so a pending `BLPOP` never stalls
/// a push multiplexed on the same socket.
#[derive(Clone)]
pub struct RedisQueue {
    name: String,
    push_conn: MultiplexedConnection,
    pop_conn: MultiplexedConnection,
    poll_interval: Duration,
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue")
            .field("name", &self.name)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl RedisQueue {
    /// Connect to the broker at `host:port` and bind to the list `name`
    pub async fn connect(
        host: &str,
        port: u16,
        name: impl Into<String>,
        poll_interval: Duration,
    ) -> MessagingResult<Self> {
        let name = name.into();
        let url = format!("redis://{host}:{port}/");
        info!("🚀 REDIS: Connecting queue {} at {}", name, url);

        let client = redis::Client::open(url.as_str())
            .map_err(|e| MessagingError::connection(format!("invalid broker url {url}: {e}")))?;

        let response_timeout = poll_interval + RESPONSE_TIMEOUT_SLACK;
        let push_conn = client
            .get_multiplexed_async_connection_with_timeouts(response_timeout, CONNECTION_TIMEOUT)
            .await
            .map_err(|e| MessagingError::connection(format!("failed to connect to {url}: {e}")))?;
        let pop_conn = client
            .get_multiplexed_async_connection_with_timeouts(response_timeout, CONNECTION_TIMEOUT)
            .await
            .map_err(|e| MessagingError::connection(format!("failed to connect to {url}: {e}")))?;

        info!("✅ REDIS: Queue {} connected", name);
        Ok(Self {
            name,
            push_conn,
            pop_conn,
            poll_interval,
        })
    }

    async fn blpop(&self, window: Duration) -> MessagingResult<Option<String>> {
        let mut conn = self.pop_conn.clone();
        // BLPOP treats 0 as "block forever"
        let seconds = window.as_secs_f64().max(0.01);
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(&self.name)
            .arg(seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| MessagingError::redis(&self.name, "BLPOP", e))?;
        Ok(popped.map(|(_, payload)| payload))
    }
}

/// Wait for an item by repeating `attempt` with windows of at most
/// `poll_interval`.
///
/// `None` waits until an attempt yields an item. `Some(timeout)` stops with
/// `Ok(None)` once the deadline has passed; the last window is shortened to
/// end at the deadline. At least one attempt is always made.
async fn sliced_pop<F, Fut>(
    timeout: Option<Duration>,
    poll_interval: Duration,
    mut attempt: F,
) -> MessagingResult<Option<String>>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = MessagingResult<Option<String>>>,
{
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        let window = match deadline {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(poll_interval),
            None => poll_interval,
        };
        if let Some(payload) = attempt(window).await? {
            return Ok(Some(payload));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(None);
        }
    }
}

#[async_trait]
impl QueueBackend for RedisQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, payload: String) -> MessagingResult<()> {
        let mut conn = self.push_conn.clone();
        let length: i64 = redis::cmd("RPUSH")
            .arg(&self.name)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| MessagingError::redis(&self.name, "RPUSH", e))?;
        debug!("📤 REDIS: {} now holds {} items", self.name, length);
        Ok(())
    }

    async fn pop(&self, timeout: Option<Duration>) -> MessagingResult<Option<String>> {
        sliced_pop(timeout, self.poll_interval, |window| self.blpop(window)).await
    }
}
