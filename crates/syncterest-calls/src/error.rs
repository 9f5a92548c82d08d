use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Already in a call")]
    AlreadyInCall,

    #[error("No call in progress")]
    NoActiveCall,

    #[error("No pending offer to answer")]
    NoPendingOffer,

    #[error("Unexpected signal in state {state}: {signal}")]
    UnexpectedSignal {
        state: &'static str,
        signal: &'static str,
    },

    #[error("Media device unavailable: {0}")]
    MediaUnavailable(String),
}

pub type Result<T> = std::result::Result<T, CallError>;
