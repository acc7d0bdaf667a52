//! Error types for the intake bot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Webhook operation {op} failed: {reason}")]
    WebhookFailed { op: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Record sink errors.
///
/// A sink failure never unwinds the conversation state machine; callers log
/// it and clear the session anyway (lossy-on-failure policy).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to open record log: {0}")]
    Open(String),

    #[error("Failed to append record: {0}")]
    Append(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
