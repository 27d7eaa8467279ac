use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    #[error("Console command rejected: {reply}")]
    CommandRejected { reply: String },

    #[error("Request timed out after {seconds}s: {operation}")]
    TimeoutError { operation: String, seconds: u64 },

    #[error("Sink write failed: {message}")]
    SinkError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Expected during normal operation, the next cycle retries.
    Low,
    /// Transient infrastructure failure.
    Medium,
    /// Misconfiguration, the process cannot start.
    Critical,
}

impl SyncError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
            SyncError::CommandRejected { .. } | SyncError::ProtocolError { .. } => {
                ErrorSeverity::Low
            }
            _ => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SyncError::ConfigError { .. } | SyncError::InvalidConfigValueError { .. } => {
                "Check the TOML configuration file against world-status.example.toml"
            }
            SyncError::MissingConfigError { .. } => {
                "Add the missing field to the configuration or export the matching environment variable"
            }
            SyncError::HttpError(_) | SyncError::SinkError { .. } => {
                "Check the repository coordinates and that the access token can write contents"
            }
            SyncError::WebSocketError(_) | SyncError::TimeoutError { .. } => {
                "Check that the game server is running and reachable on the configured host and port"
            }
            SyncError::IoError(_) => "Check file permissions and that the host/port is reachable",
            SyncError::SerializationError(_) | SyncError::ProtocolError { .. } => {
                "The server sent an unexpected payload; run with --verbose to inspect it"
            }
            SyncError::CommandRejected { .. } => "No action needed, this is a negative probe result",
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
