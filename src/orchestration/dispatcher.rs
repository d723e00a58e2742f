//! # Dispatcher
//!
//! The listener loop: pull requests off the input queue, turn each parameter
//! into a task chain, and record the chain in the registry. The loop stops on
//! the shutdown sentinel or on a transport failure; it never waits for a
//! chain to finish.

use tracing::{error, info, instrument};

use super::registry::TaskRegistry;
use super::task_chain::{ChainFactory, TaskChain};
use crate::logging::{log_error, log_queue_operation};
use crate::messaging::{MessagingError, Parameter, Request, TypedQueue};

#[derive(Debug, Clone)]
pub struct Dispatcher {
    requests: TypedQueue<Request>,
    registry: TaskRegistry,
    factory: ChainFactory,
}

impl Dispatcher {
    pub fn new(requests: TypedQueue<Request>, registry: TaskRegistry, factory: ChainFactory) -> Self {
        Self {
            requests,
            registry,
            factory,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Listen until the sentinel arrives; returns how many chains were dispatched
    #[instrument(skip(self), fields(queue = %self.requests.name()))]
    pub async fn run(&self) -> Result<usize, MessagingError> {
        info!("👂 DISPATCHER: Listening on {}", self.requests.name());
        let mut dispatched = 0usize;

        loop {
            let request = match self.requests.get(None).await {
                Ok(Some(request)) => request,
                // Only reachable with a timeout; keep waiting
                Ok(None) => continue,
                Err(e) => {
                    error!(
                        "❌ DISPATCHER: Input queue failed after {} dispatches: {}",
                        dispatched, e
                    );
                    log_error("dispatcher", "dequeue", &e.to_string(), Some(self.requests.name()));
                    return Err(e);
                }
            };

            match request {
                Request::Parameter(parameter) => {
                    self.dispatch(parameter).await;
                    dispatched += 1;
                }
                Request::Shutdown => {
                    log_queue_operation(
                        "dequeue",
                        self.requests.name(),
                        "shutdown",
                        Some(&format!("{dispatched} chains dispatched")),
                    );
                    info!(
                        "🛑 DISPATCHER: Shutdown sentinel received after {} dispatches",
                        dispatched
                    );
                    return Ok(dispatched);
                }
            }
        }
    }

    /// Build the chain for one parameter and register it
    pub async fn dispatch(&self, parameter: Parameter) -> TaskChain {
        info!("📨 DISPATCHER: Run application for parameter {}", parameter);
        let chain = self.factory.spawn(parameter).await;
        let position = self.registry.append(chain.clone());
        log_queue_operation(
            "dispatch",
            self.requests.name(),
            "registered",
            Some(&format!("parameter={parameter} position={position}")),
        );
        chain
    }
}
