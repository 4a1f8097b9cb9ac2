use thiserror::Error;

#[derive(Debug, Error)]
pub enum VentoError {
    #[error("source fetch failed: {message}")]
    SourceFetch { message: String },
    #[error("empty dataset: {message}")]
    EmptyDataset { message: String },
    #[error("source query failed: {message}")]
    Query { message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("config error: {message}")]
    Config { message: String },
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("write failed: {message}")]
    Write { message: String },
}

impl VentoError {
    pub fn source_fetch(message: impl Into<String>) -> Self {
        Self::SourceFetch {
            message: message.into(),
        }
    }

    pub fn empty_dataset(message: impl Into<String>) -> Self {
        Self::EmptyDataset {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Detail text without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::SourceFetch { message }
            | Self::EmptyDataset { message }
            | Self::Query { message }
            | Self::InvalidInput { message }
            | Self::Config { message }
            | Self::Storage { message }
            | Self::Write { message } => message,
        }
    }

    /// Errors that end a pipeline run before anything is persisted.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            Self::SourceFetch { .. } | Self::EmptyDataset { .. } | Self::Query { .. }
        )
    }
}

pub type VentoResult<T> = Result<T, VentoError>;

impl From<sea_orm::DbErr> for VentoError {
    fn from(value: sea_orm::DbErr) -> Self {
        VentoError::storage(value.to_string())
    }
}
