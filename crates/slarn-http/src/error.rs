use slarn_core::AutocompleteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpSourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    Api(String, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid search URL: {0}")]
    InvalidUrl(String),
}

impl From<HttpSourceError> for AutocompleteError {
    fn from(e: HttpSourceError) -> Self {
        AutocompleteError::SearchTransport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HttpSourceError>;
