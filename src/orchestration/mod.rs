//! # Orchestration
//!
//! The method server's control flow: the dispatcher listens on the input
//! queue and builds one task chain per parameter, the registry keeps every
//! chain, and the drain unwraps them all once the listener stops.
//!
//! ## Core Components
//!
//! - **Dispatcher**: listener loop over the input queue
//! - **TaskChain / ChainHandle**: job then publish, observed through shared handles
//! - **TaskRegistry**: append-only record of dispatched chains
//! - **Drain**: resolves every chain and waits for the pools to go idle
//! - **MethodServer**: wires it all together

pub mod dispatcher;
pub mod drain;
pub mod registry;
pub mod server;
pub mod task_chain;

pub use dispatcher::Dispatcher;
pub use drain::{drain, ChainRecord, DrainReport};
pub use registry::TaskRegistry;
pub use server::MethodServer;
pub use task_chain::{ChainFactory, ChainHandle, ChainLink, ChainOutcome, TaskChain};
