//! # Error Types
//!
//! Top-level error for the method server plus the per-chain failure type that
//! travels through task chain handles.

use std::path::Path;

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::messaging::Parameter;

/// Failures that terminate a single task chain.
///
/// Chain handles are shared futures, so every observer receives its own copy
/// of the same failure; the error is therefore `Clone` and carries its context
/// as owned strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Job execution failed for parameter {parameter}: {message}")]
    JobExecution { parameter: Parameter, message: String },

    #[error("Artifact read failed: {path}: {message}")]
    ArtifactRead { path: String, message: String },

    #[error("Artifact format invalid: {path}: expected an integer, found {content:?}")]
    ArtifactFormat { path: String, content: String },

    #[error("Result transport failed for parameter {parameter}: {message}")]
    Transport { parameter: Parameter, message: String },

    #[error("Chain for parameter {parameter} exceeded link depth {max_depth}")]
    DrainIntegrity { parameter: Parameter, max_depth: usize },

    #[error("Task for parameter {parameter} aborted: {message}")]
    Aborted { parameter: Parameter, message: String },
}

impl ChainError {
    pub fn job_execution(parameter: Parameter, message: impl Into<String>) -> Self {
        Self::JobExecution {
            parameter,
            message: message.into(),
        }
    }

    pub fn artifact_read(path: &Path, message: impl Into<String>) -> Self {
        Self::ArtifactRead {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    pub fn artifact_format(path: &Path, content: impl Into<String>) -> Self {
        Self::ArtifactFormat {
            path: path.display().to_string(),
            content: content.into(),
        }
    }

    pub fn transport(parameter: Parameter, message: impl Into<String>) -> Self {
        Self::Transport {
            parameter,
            message: message.into(),
        }
    }

    pub fn aborted(parameter: Parameter, message: impl Into<String>) -> Self {
        Self::Aborted {
            parameter,
            message: message.into(),
        }
    }

    /// Short classification used in logs and drain tallies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JobExecution { .. } => "job_execution",
            Self::ArtifactRead { .. } => "artifact_read",
            Self::ArtifactFormat { .. } => "artifact_format",
            Self::Transport { .. } => "transport",
            Self::DrainIntegrity { .. } => "drain_integrity",
            Self::Aborted { .. } => "aborted",
        }
    }

    /// Whether this failure points at a defect in chain composition rather
    /// than at a bad job or artifact.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::DrainIntegrity { .. })
    }
}

/// Server-level errors
#[derive(Error, Debug)]
pub enum MethodServerError {
    #[error("Transport error: {0}")]
    Transport(#[from] MessagingError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MethodServerError>;
