use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Irrecoverable mismatch between the benchmark, the model and the tokenizer.
    #[error("Invalid benchmark: {0}")]
    InvalidBenchmark(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl CoreError {
    pub fn invalid_benchmark(msg: impl Into<String>) -> Self {
        CoreError::InvalidBenchmark(msg.into())
    }

    pub fn is_invalid_benchmark(&self) -> bool {
        matches!(self, CoreError::InvalidBenchmark(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}
