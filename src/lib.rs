#![allow(clippy::doc_markdown)] // Allow technical terms like BLPOP, YAML in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # MPI Method Server
//!
//! A long-running service that turns requests on an input queue into
//! asynchronous external jobs and publishes each job's result on an output
//! queue.
//!
//! ## Overview
//!
//! ```text
//!   input queue ──▶ Dispatcher ──▶ external job ──▶ publisher ──▶ output queue
//!                       │               (htex)      (local_threads)
//!                       ▼
//!                 TaskRegistry ──▶ Drain (on shutdown sentinel)
//! ```
//!
//! Every parameter pulled off the input queue becomes a task chain: a
//! simulated (or shell) job that writes an integer to an artifact file,
//! followed by a publication step that reads the artifact and enqueues
//! `(parameter, value)`. Results arrive in completion order. A `null` on the
//! input queue stops the listener; every chain already dispatched is then
//! drained before the server exits.
//!
//! ## Module Organization
//!
//! - [`config`] - YAML/environment configuration and validation
//! - [`messaging`] - queue abstraction, Redis and in-memory backends, wire types
//! - [`execution`] - execution pools, artifacts, job runners, result publisher
//! - [`orchestration`] - dispatcher, task chains, registry, drain, server facade
//! - [`logging`] - structured logging setup
//! - [`error`] - server and per-chain error types
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use method_server::config::ConfigManager;
//! use method_server::orchestration::MethodServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let server = MethodServer::connect(manager.config()).await?;
//! let report = server.run().await;
//! println!("{}", report.tally());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod logging;
pub mod messaging;
pub mod orchestration;

pub use config::{ConfigManager, ServerConfig};
pub use constants::MAX_CHAIN_DEPTH;
pub use error::{ChainError, MethodServerError, Result};
pub use messaging::{MethodServerQueues, Parameter, Request, ResultPair};
pub use orchestration::{DrainReport, MethodServer};
