//! Error types shared by the workflow engine.

use std::path::PathBuf;

/// Errors raised at the seams of the workflow engine.
///
/// Validation problems are not errors: phases report them as warnings in
/// their result and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Missing credentials, unreadable config, unknown role
    #[error("Configuration error: {0}")]
    Config(String),

    /// No template could be found for a phase
    #[error("Template not found for {kind}: {location}")]
    TemplateNotFound { kind: String, location: String },

    /// The content generator returned no usable text
    #[error(transparent)]
    Generation(#[from] crate::workflow::GenerationError),

    /// Every feature number up to this one is taken
    #[error("No feature number left after {0}")]
    FeatureNumbersExhausted(u32),

    /// Reading or writing an artifact failed
    #[error("Artifact store error at {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata or analysis could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operator interrupted the run
    #[error("Workflow cancelled by operator")]
    Cancelled,
}

impl WorkflowError {
    /// Wrap an I/O error with the path it happened on.
    pub fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store { path: path.into(), source }
    }

    /// Whether this error should stop the current phase.
    ///
    /// Everything except cancellation is a hard phase failure; cancellation
    /// is handled by the orchestrator as its own terminal state.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result alias for the workflow engine.
pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;
