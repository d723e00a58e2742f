//! # System Constants
//!
//! Operational boundaries of the method server.

/// Handles resolved while unwrapping one task chain: the job handle, then
/// the publication handle it points to. A chain that needs more is broken.
pub const MAX_CHAIN_DEPTH: usize = 2;

/// Seconds-scale unit of the simulated job delay (`1 + p mod 2` units)
pub const DEFAULT_TIME_UNIT_MS: u64 = 1000;

/// Artifact file name stem; `simulate_<p>.out`
pub const ARTIFACT_STEM: &str = "simulate";
pub const ARTIFACT_EXTENSION: &str = "out";

/// Exit codes used by the command-line tools
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// The listener stopped on a transport error
    pub const LISTENER_FAILED: i32 = 2;
    /// A chain exceeded the unwrap depth
    pub const DRAIN_INTEGRITY: i32 = 3;
}

/// Usage text printed by `method-server` on startup
pub const BANNER: &str = r#"Method server: listens on an input queue and writes results on an output queue

    input queue --> method-server --> output queue

To request a run, add a parameter to the input queue:
    pipeline-pump -p N          (N an integer)
To stop the server once everything dispatched has finished:
    pipeline-pump --shutdown
To take a result off the output queue:
    pipeline-pull               (blocks)
    pipeline-pull -t T          (gives up after T seconds)
"#;
