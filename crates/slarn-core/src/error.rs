use thiserror::Error;

/// All errors that can occur in slarn-core.
#[derive(Debug, Error)]
pub enum AutocompleteError {
    /// Invalid configuration shape, or a `selected_id` that does not fit the
    /// selection mode.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A template placeholder path does not resolve against an item.
    #[error("Can't find the key \"{segment}\" in the object \"{object}\"")]
    FieldResolution { segment: String, object: String },

    /// The remote search capability failed.
    #[error("Search transport error: {0}")]
    SearchTransport(String),

    /// An item lacks a scalar identity value under the configured `key`.
    #[error("Item has no number or string \"{key}\" field")]
    MissingKey { key: String },

    #[error("Removing from the selection requires multiple mode")]
    NotMultiple,

    #[error("Selection position {position} out of range ({len} selected)")]
    SelectionOutOfRange { position: usize, len: usize },

    #[error("Suggestion index {index} out of range ({len} suggestions)")]
    SuggestionOutOfRange { index: usize, len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl AutocompleteError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::SearchTransport(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AutocompleteError>;
