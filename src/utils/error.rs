use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid parameter {param}: '{value}' ({reason})")]
    InvalidInputError {
        param: String,
        value: String,
        reason: String,
    },

    #[error("Upstream {url} answered with status {status}")]
    UpstreamStatusError { url: String, status: u16 },

    #[error("Upstream {url} returned a malformed body: {message}")]
    UpstreamBodyError { url: String, message: String },

    #[error("fibonacci({n}) does not fit in 64 bits")]
    OverflowError { n: u64 },

    #[error("Worker error: {message}")]
    WorkerError { message: String },
}

impl BenchError {
    pub fn invalid_input(param: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        BenchError::InvalidInputError {
            param: param.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures caused by a peer the engine delegated to.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            BenchError::HttpError(_)
                | BenchError::UpstreamStatusError { .. }
                | BenchError::UpstreamBodyError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
