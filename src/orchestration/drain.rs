//! # Drain
//!
//! Shutdown path of the method server. Once the listener has returned, every
//! registered chain is unwrapped to its terminal value in insertion order,
//! then both pools are waited on until nothing is outstanding.

use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::registry::TaskRegistry;
use super::task_chain::ChainOutcome;
use crate::error::ChainError;
use crate::execution::{ArtifactRef, ExecutionPools};
use crate::logging::log_chain_operation;
use crate::messaging::{MessagingError, Parameter, ResultPair};

/// Terminal value of one chain as seen by the drain
#[derive(Debug, Clone)]
pub struct ChainRecord {
    pub parameter: Parameter,
    pub artifact: ArtifactRef,
    pub outcome: ChainOutcome,
}

/// Summary of a completed drain
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    /// Chains found in the registry, in insertion order
    pub records: Vec<ChainRecord>,
    /// Set when the listener stopped on anything but the sentinel
    pub listener_error: Option<String>,
    pub elapsed: Duration,
}

impl DrainReport {
    pub fn dispatched(&self) -> usize {
        self.records.len()
    }

    pub fn successes(&self) -> impl Iterator<Item = &ResultPair> {
        self.records.iter().filter_map(|r| r.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (Parameter, &ChainError)> {
        self.records
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.parameter, e)))
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn integrity_violations(&self) -> usize {
        self.failures()
            .filter(|(_, e)| e.is_integrity_violation())
            .count()
    }

    /// True when the listener exited on the sentinel and no chain was broken.
    ///
    /// Per-chain job or publish failures do not make a drain unclean.
    pub fn is_clean(&self) -> bool {
        self.listener_error.is_none() && self.integrity_violations() == 0
    }

    /// One-line tally for the console
    pub fn tally(&self) -> String {
        format!(
            "{} dispatched, {} succeeded, {} failed",
            self.dispatched(),
            self.success_count(),
            self.failure_count()
        )
    }
}

/// Wait for the listener, resolve every chain, then wait for the pools
pub async fn drain(
    listener: JoinHandle<Result<usize, MessagingError>>,
    registry: &TaskRegistry,
    pools: &ExecutionPools,
) -> DrainReport {
    let started = Instant::now();
    let mut report = DrainReport::default();

    match listener.await {
        Ok(Ok(count)) => info!("🛑 DRAIN: Listener finished after {} dispatches", count),
        Ok(Err(e)) => {
            error!("❌ DRAIN: Listener stopped on transport error: {}", e);
            report.listener_error = Some(e.to_string());
        }
        Err(join_error) => {
            error!("❌ DRAIN: Listener task aborted: {}", join_error);
            report.listener_error = Some(join_error.to_string());
        }
    }

    let mut cursor = 0usize;
    loop {
        let pending = registry.since(cursor);
        if pending.is_empty() {
            pools.wait_for_current_tasks().await;
            // Nothing may be appended once the listener is gone, but a
            // direct dispatch during the wait would still be drained
            if registry.len() == cursor {
                break;
            }
            continue;
        }

        for chain in pending {
            let outcome = chain.outcome().await;
            match &outcome {
                Ok(pair) => {
                    log_chain_operation("drain", chain.parameter, "succeeded", Some(&pair.to_string()))
                }
                Err(e) if e.is_integrity_violation() => {
                    warn!("⚠️ DRAIN: {}", e);
                    log_chain_operation("drain", chain.parameter, "integrity", Some(&e.to_string()))
                }
                Err(e) => log_chain_operation("drain", chain.parameter, e.kind(), Some(&e.to_string())),
            }
            report.records.push(ChainRecord {
                parameter: chain.parameter,
                artifact: chain.artifact.clone(),
                outcome,
            });
            cursor += 1;
        }
    }

    report.elapsed = started.elapsed();
    info!(
        "✅ DRAIN: Complete in {:?}: {}",
        report.elapsed,
        report.tally()
    );
    report
}
