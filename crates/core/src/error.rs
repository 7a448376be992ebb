use std::io;

/// Errors that can occur while composing or dispatching build configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Invalid options: {path}: {message}")]
    Validation { path: String, message: String },

    #[error("Composition error: {0}")]
    Composition(String),

    #[error("command \"{0}\" does not exist")]
    CommandNotFound(String),

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for forgepack operations
pub type Result<T> = std::result::Result<T, Error>;
