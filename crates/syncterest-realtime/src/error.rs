use thiserror::Error;

/// Errors produced by the realtime layer.
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Not connected")]
    NotConnected,

    #[error("Socket task is gone")]
    SocketGone,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RealtimeError>;
