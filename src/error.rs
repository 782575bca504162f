//! Error types for the wrapper build pipeline.
//!
//! Four error classes map onto the pipeline stages: validation, generation,
//! build, and publish. Every terminal failure carries a machine-readable
//! reason string alongside the human-readable message.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Top-level error for all pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// One or more BuildConfig fields were missing or malformed
    #[error("{0}")]
    Validation(#[from] crate::config::ValidationError),

    /// Template or registry inconsistency after successful validation
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Toolchain invocation failed
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// Artifact or release API failed with no artifact produced
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors (malformed request payload)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Process exit code for this error class.
    ///
    /// `0` is reserved for `Completed` jobs (including release sub-failures),
    /// so every error here maps to a non-zero code.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Validation(_) => 2,
            PipelineError::Build(_) => 3,
            PipelineError::Publish(_) => 4,
            _ => 1,
        }
    }
}

/// Internal consistency failures during resource generation or templating.
///
/// These indicate a bug when they occur after successful validation: the
/// validator guarantees registry membership, and the skeleton is static.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// A skeleton placeholder had no corresponding value
    #[error("unresolved placeholder in {template}: {reason}")]
    UnresolvedPlaceholder {
        /// Skeleton file being rendered
        template: String,
        /// Render failure detail
        reason: String,
    },

    /// An icon key passed validation but is missing from the registry
    #[error("icon key not in registry: {key}")]
    UnknownIconKey {
        /// The offending key
        key: String,
    },

    /// Icon rasterization or encoding failed
    #[error("icon encoding failed for {key}: {reason}")]
    IconEncoding {
        /// Icon key being rendered
        key: String,
        /// Encoder failure detail
        reason: String,
    },
}

/// Toolchain invocation failures, classified at invocation time.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Dependency fetch or resource contention; retried with backoff
    #[error("transient toolchain failure: {reason}")]
    Transient {
        /// Failure detail
        reason: String,
    },

    /// Compilation error or invalid generated manifest; never retried
    #[error("fatal toolchain failure: {reason}")]
    Fatal {
        /// Failure detail
        reason: String,
    },

    /// Per-job timeout elapsed while the toolchain was running
    #[error("build cancelled after {elapsed_secs}s")]
    Cancelled {
        /// Seconds elapsed when the job was cancelled
        elapsed_secs: u64,
    },
}

impl BuildError {
    /// Whether the orchestrator may retry this failure
    pub fn is_transient(&self) -> bool {
        matches!(self, BuildError::Transient { .. })
    }
}

/// Artifact or release API failures.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Artifact upload failed
    #[error("artifact upload failed: {reason}")]
    Upload {
        /// Failure detail
        reason: String,
    },

    /// Release creation failed
    #[error("release creation failed for tag {tag}: {reason}")]
    Release {
        /// Release tag that could not be created
        tag: String,
        /// Failure detail
        reason: String,
    },

    /// Store lookup failed (existence checks)
    #[error("artifact store lookup failed: {reason}")]
    Lookup {
        /// Failure detail
        reason: String,
    },
}
