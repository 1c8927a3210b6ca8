//! Media provider client errors

/// Client result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors talking to the hosted media provider
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider API key is not configured")]
    MissingApiKey,

    #[error("Invalid room URL: {0}")]
    InvalidRoomUrl(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Whether the provider rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
    }
}
