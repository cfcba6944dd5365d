use ligprep::core::io::IoError;
use ligprep::engine::config::ConfigError;
use ligprep::workflows::collection::SchedulerError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Collection(#[from] IoError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Work unit error: {0}")]
    WorkUnit(String),

    #[error("Failed to deliver '{path}': {source}", path = path.display())]
    Delivery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_keep_their_message() {
        let err: CliError = ConfigError::MissingParameter("target_formats").into();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required parameter: target_formats"
        );
    }

    #[test]
    fn delivery_errors_name_the_artifact() {
        let err = CliError::Delivery {
            path: PathBuf::from("/out/L1.smi"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "Failed to deliver '/out/L1.smi': disk full");
    }
}
