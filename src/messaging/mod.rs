//! # Messaging Module
//!
//! Request and result queues for the method server: wire formats, the
//! backend trait, and the in-memory and Redis brokers.

pub mod errors;
pub mod memory_queue;
pub mod message;
pub mod queue;
pub mod redis_queue;

pub use errors::{MessagingError, MessagingResult};
pub use memory_queue::MemoryQueue;
pub use message::{Parameter, Request, ResultPair, ResultValue};
pub use queue::{MethodServerQueues, QueueBackend, TypedQueue};
pub use redis_queue::RedisQueue;
