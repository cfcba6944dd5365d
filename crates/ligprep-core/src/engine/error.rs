use crate::core::chem::ChemError;
use crate::core::tranche::TrancheError;
use std::time::Duration;
use thiserror::Error;

/// Failure of one stage attempt or of a pipeline step around it.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid engine choice for a stage, or no engine remaining. Never the
    /// result of contacting an engine.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Engine '{engine}' failed: {reason}")]
    Execution { engine: String, reason: String },

    #[error("Engine '{engine}' timed out after {timeout:?}")]
    Timeout { engine: String, timeout: Duration },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn execution(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Execution {
            engine: engine.into(),
            reason: reason.into(),
        }
    }
}

impl From<ChemError> for EngineError {
    fn from(err: ChemError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<TrancheError> for EngineError {
    fn from(err: TrancheError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// An obligatory step failed; the node and everything derived from it stop.
#[derive(Debug, Error)]
#[error("Stage '{stage}' aborted processing: {source}")]
pub struct NodeAborted {
    pub stage: String,
    #[source]
    pub source: EngineError,
}

impl NodeAborted {
    pub fn new(stage: impl Into<String>, source: EngineError) -> Self {
        Self {
            stage: stage.into(),
            source,
        }
    }
}
