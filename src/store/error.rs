use thiserror::Error;

/// Errors from notification backend operations.
///
/// All backend calls resolve to a result; producers log these and let the
/// next periodic tick retry naturally.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned HTTP {0}")]
    Http(u16),

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            StoreError::Http(status.as_u16())
        } else if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Network(e.to_string())
        }
    }
}
