use thiserror::Error;

/// Error kinds the client distinguishes. Foreground operations surface
/// these to the caller; background refreshes log them and move on.
#[derive(Debug, Error)]
pub enum SwellMateError {
    /// The requested record does not exist server-side. Recoverable:
    /// preference lookups fall back to level defaults on this.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation was rejected before any request was made
    /// (empty day selection, no spots, protected preset).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request never produced an HTTP response (DNS, connect,
    /// timeout, malformed body).
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a failure status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Local cache or keychain failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<SwellMateError> for String {
    fn from(err: SwellMateError) -> Self {
        err.to_string()
    }
}

impl From<reqwest::Error> for SwellMateError {
    fn from(err: reqwest::Error) -> Self {
        SwellMateError::Network(err.to_string())
    }
}

impl From<rusqlite::Error> for SwellMateError {
    fn from(err: rusqlite::Error) -> Self {
        SwellMateError::Storage(err.to_string())
    }
}

impl SwellMateError {
    /// Whether this error means "record absent" rather than "operation
    /// failed". Callers use this to trigger defaults fallback.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SwellMateError::NotFound(_))
    }
}
