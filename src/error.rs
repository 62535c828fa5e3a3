//! Error taxonomy for the search engine

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("Embedding provider error: {message}")]
    Provider { message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Validation { message: String },
    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Message safe to show to an end user.
    ///
    /// Storage and transport details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { .. } => {
                "Search is not configured. Check the embedding provider settings.".to_string()
            }
            Self::Provider { .. } | Self::Http(_) => {
                "The embedding service is unavailable right now. Please try again.".to_string()
            }
            Self::Validation { message } => message.clone(),
            Self::DimensionMismatch { .. } => {
                "The search index was built with a different embedding model. Rebuild the index."
                    .to_string()
            }
            Self::NoteNotFound { .. } => "That note no longer exists.".to_string(),
            Self::Storage(_) | Self::Serialization(_) | Self::Io(_) => {
                "Search failed due to an internal error.".to_string()
            }
        }
    }
}
