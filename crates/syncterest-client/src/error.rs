use thiserror::Error;

use syncterest_calls::CallError;
use syncterest_realtime::RealtimeError;
use syncterest_shared::validation::FieldError;
use syncterest_store::StoreError;

/// Postgres error code for a unique-constraint violation. Membership
/// inserts treat it as "already a member".
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("Internal state lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for ClientError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        ClientError::Poisoned
    }
}

impl ClientError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, ClientError::Api { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }

    /// Permission and device errors are mapped to a small fixed message
    /// set instead of surfacing raw backend text.
    pub fn surface_message(&self) -> String {
        match self {
            ClientError::Api { status: 401, .. } | ClientError::NotSignedIn => {
                "Please sign in again".to_string()
            }
            ClientError::Api { status: 403, .. } => {
                "You don't have permission to do that".to_string()
            }
            ClientError::Timeout(what) => format!("Timed out waiting for {what}"),
            ClientError::Call(CallError::MediaUnavailable(_)) => {
                "Camera or microphone unavailable".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_detection() {
        let err = ClientError::Api {
            status: 409,
            code: Some(UNIQUE_VIOLATION.to_string()),
            message: "duplicate key value violates unique constraint".into(),
        };
        assert!(err.is_unique_violation());

        let other = ClientError::Api {
            status: 409,
            code: Some("23503".to_string()),
            message: "foreign key violation".into(),
        };
        assert!(!other.is_unique_violation());
    }

    #[test]
    fn permission_errors_use_fixed_messages() {
        let err = ClientError::Api {
            status: 403,
            code: None,
            message: "row level security".into(),
        };
        assert_eq!(err.surface_message(), "You don't have permission to do that");
    }
}
