//! # Queue Abstraction
//!
//! A FIFO of JSON payloads with blocking pop and non-blocking push, plus the
//! typed request/result pair the method server listens and publishes on.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::errors::MessagingResult;
use super::memory_queue::MemoryQueue;
use super::message::{Parameter, Request, ResultPair};
use super::redis_queue::RedisQueue;
use crate::config::QueueConfig;

/// Raw payload queue implemented by each broker
///
/// `pop(None)` waits until an item arrives. `pop(Some(timeout))` returns
/// `Ok(None)` once the timeout elapses without an item.
#[async_trait]
pub trait QueueBackend: Send + Sync + Debug {
    /// Queue name, used for logging and error context
    fn name(&self) -> &str;

    /// Append a payload to the tail of the queue
    async fn push(&self, payload: String) -> MessagingResult<()>;

    /// Remove a payload from the head of the queue
    async fn pop(&self, timeout: Option<Duration>) -> MessagingResult<Option<String>>;
}

/// JSON-typed view over a [`QueueBackend`]
#[derive(Debug)]
pub struct TypedQueue<T> {
    backend: Arc<dyn QueueBackend>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> TypedQueue<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self {
            backend,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    /// Serialize and enqueue an item
    pub async fn put(&self, item: &T) -> MessagingResult<()> {
        let payload = serde_json::to_string(item)?;
        debug!("📤 QUEUE: put on {}: {}", self.backend.name(), payload);
        self.backend.push(payload).await
    }

    /// Dequeue and deserialize an item, waiting at most `timeout` when given
    pub async fn get(&self, timeout: Option<Duration>) -> MessagingResult<Option<T>> {
        match self.backend.pop(timeout).await? {
            Some(payload) => {
                debug!("📥 QUEUE: got from {}: {}", self.backend.name(), payload);
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }
}

/// Request and result queues shared by the server and its clients
#[derive(Debug, Clone)]
pub struct MethodServerQueues {
    pub requests: TypedQueue<Request>,
    pub results: TypedQueue<ResultPair>,
}

impl MethodServerQueues {
    pub fn new(requests: Arc<dyn QueueBackend>, results: Arc<dyn QueueBackend>) -> Self {
        Self {
            requests: TypedQueue::new(requests),
            results: TypedQueue::new(results),
        }
    }

    /// In-process queue pair, used by tests and embedded servers
    pub fn in_memory(prefix: &str) -> Self {
        Self::new(
            Arc::new(MemoryQueue::new(format!("{prefix}_inputs"))),
            Arc::new(MemoryQueue::new(format!("{prefix}_results"))),
        )
    }

    /// Queue pair on the Redis broker described by `config`
    pub async fn connect_redis(config: &QueueConfig) -> MessagingResult<Self> {
        let poll_interval = config.poll_interval();
        let requests = RedisQueue::connect(
            &config.host,
            config.port,
            config.input_queue_name(),
            poll_interval,
        )
        .await?;
        let results = RedisQueue::connect(
            &config.host,
            config.port,
            config.output_queue_name(),
            poll_interval,
        )
        .await?;
        Ok(Self::new(Arc::new(requests), Arc::new(results)))
    }

    /// Client side: request a run for `parameter`
    pub async fn send_parameter(&self, parameter: Parameter) -> MessagingResult<()> {
        self.requests.put(&Request::Parameter(parameter)).await
    }

    /// Client side: ask the server to stop listening
    pub async fn send_shutdown(&self) -> MessagingResult<()> {
        self.requests.put(&Request::Shutdown).await
    }

    /// Client side: take the next finished result
    pub async fn get_result(&self, timeout: Option<Duration>) -> MessagingResult<Option<ResultPair>> {
        self.results.get(timeout).await
    }
}
