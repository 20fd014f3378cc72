use crate::config::ConfigError;

/// Errors raised while bringing up or running the camera node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Requested stream is not supported: {0}")]
    StreamUnsupported(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Zenoh error: {0}")]
    Zenoh(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;
