//! Error taxonomy shared by every layer of the core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No response was received (connect failure, timeout, broken body).
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with a non-2xx status.
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// The credential file exists but its envelope could not be opened.
    #[error("stored credentials could not be decrypted: {0}")]
    Decryption(String),

    /// An authorization attempt ended without a usable code.
    #[error("authorization abandoned: {0}")]
    AuthorizationAbandoned(String),

    /// No usable token and no way to refresh one.
    #[error("not authorized")]
    Unauthorized,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}
