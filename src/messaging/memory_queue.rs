//! In-process queue backend built on tokio channels.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use super::errors::{MessagingError, MessagingResult};
use super::queue::QueueBackend;

/// Unbounded FIFO living inside the server process
#[derive(Debug)]
pub struct MemoryQueue {
    name: String,
    sender: mpsc::UnboundedSender<String>,
    receiver: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

#[async_trait]
impl QueueBackend for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, payload: String) -> MessagingResult<()> {
        self.sender
            .send(payload)
            .map_err(|_| MessagingError::queue_closed(&self.name))
    }

    async fn pop(&self, timeout: Option<Duration>) -> MessagingResult<Option<String>> {
        let mut receiver = self.receiver.lock().await;
        let received = match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, receiver.recv()).await {
                Ok(received) => received,
                Err(_) => return Ok(None),
            },
            None => receiver.recv().await,
        };

        // The sender lives in `self`, so the channel only closes if the
        // receiver was explicitly closed.
        received
            .map(Some)
            .ok_or_else(|| MessagingError::queue_closed(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(MemoryQueue::new("waiting"));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(None).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push("7".to_string()).await.unwrap();

        let popped = consumer.await.unwrap().unwrap();
        assert_eq!(popped.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_pop_timeout_returns_none() {
        let queue = MemoryQueue::new("empty");
        let popped = queue.pop(Some(Duration::from_millis(10))).await.unwrap();
        assert!(popped.is_none());
    }
}
