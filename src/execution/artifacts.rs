//! # Artifact Allocation
//!
//! Hands out the output path each external job writes to. A path stays
//! reserved while its task chain is in flight, so two outstanding chains
//! never share one, even when the same parameter is requested twice.

use dashmap::DashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::{ArtifactConfig, RetentionPolicy};
use crate::constants::{ARTIFACT_EXTENSION, ARTIFACT_STEM};
use crate::messaging::Parameter;

/// Location an external job writes its output to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef(PathBuf);

impl ArtifactRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Allocates artifact paths under one output directory
#[derive(Debug, Clone)]
pub struct ArtifactAllocator {
    inner: Arc<AllocatorInner>,
}

#[derive(Debug)]
struct AllocatorInner {
    output_dir: PathBuf,
    in_flight: DashMap<PathBuf, Parameter>,
    collision_counter: AtomicU64,
    dir_ready: OnceCell<()>,
}

impl ArtifactAllocator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(AllocatorInner {
                output_dir: output_dir.into(),
                in_flight: DashMap::new(),
                collision_counter: AtomicU64::new(0),
                dir_ready: OnceCell::new(),
            }),
        }
    }

    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self::new(config.output_dir.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.inner.output_dir
    }

    /// Number of paths currently reserved by in-flight chains
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Create the output directory on first use
    pub async fn ensure_output_dir(&self) -> io::Result<()> {
        self.inner
            .dir_ready
            .get_or_try_init(|| async {
                tokio::fs::create_dir_all(&self.inner.output_dir).await?;
                debug!(
                    "📁 ARTIFACTS: Output directory ready at {}",
                    self.inner.output_dir.display()
                );
                Ok::<(), io::Error>(())
            })
            .await
            .map(|_| ())
    }

    /// Reserve a fresh artifact path for `parameter`.
    ///
    /// The canonical name is `simulate_<p>.out`; if that is held by a chain
    /// still in flight, `simulate_<p>.<n>.out` is used with a counter that
    /// only grows.
    pub fn allocate(&self, parameter: Parameter) -> ArtifactLease {
        let mut path = self
            .inner
            .output_dir
            .join(format!("{ARTIFACT_STEM}_{parameter}.{ARTIFACT_EXTENSION}"));

        loop {
            match self.inner.in_flight.entry(path.clone()) {
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(parameter);
                    break;
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    let n = self.inner.collision_counter.fetch_add(1, Ordering::Relaxed) + 1;
                    path = self
                        .inner
                        .output_dir
                        .join(format!("{ARTIFACT_STEM}_{parameter}.{n}.{ARTIFACT_EXTENSION}"));
                }
            }
        }

        ArtifactLease {
            allocator: self.clone(),
            artifact: ArtifactRef(path),
        }
    }

    fn release(&self, artifact: &ArtifactRef) {
        self.inner.in_flight.remove(&artifact.0);
    }
}

/// Reservation of an artifact path; released when dropped
#[derive(Debug)]
pub struct ArtifactLease {
    allocator: ArtifactAllocator,
    artifact: ArtifactRef,
}

impl ArtifactLease {
    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }
}

impl Drop for ArtifactLease {
    fn drop(&mut self) {
        self.allocator.release(&self.artifact);
    }
}

impl RetentionPolicy {
    /// Apply the policy to an artifact whose result was published.
    ///
    /// Returns whether the file was removed.
    pub async fn apply(&self, artifact: &ArtifactRef) -> io::Result<bool> {
        match self {
            RetentionPolicy::Keep => Ok(false),
            RetentionPolicy::DeleteAfterPublish => match tokio::fs::remove_file(artifact.path()).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!("🗑️ ARTIFACTS: {} already gone", artifact);
                    Ok(false)
                }
                Err(e) => Err(e),
            },
        }
    }
}
