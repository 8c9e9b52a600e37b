use std::time::Duration;
use thiserror::Error;

use crate::types::Language;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Embedding provider failed: {0}")]
    Provider(String),

    #[error("Index integrity violated for '{language}': {detail}")]
    Integrity { language: Language, detail: String },

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    #[error("Artifact error: {0}")]
    Artifact(String),
}

impl Error {
    /// Stable machine-readable tag used in failure envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Provider(_) => "provider",
            Error::Integrity { .. } => "integrity",
            Error::EmptyQuery => "empty_query",
            Error::Timeout(_) => "timeout",
            Error::Artifact(_) => "artifact",
        }
    }

    pub fn integrity(language: Language, detail: impl Into<String>) -> Self {
        Error::Integrity { language, detail: detail.into() }
    }

    /// Client errors are the caller's fault; everything else is a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::EmptyQuery | Error::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
