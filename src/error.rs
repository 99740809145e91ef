use std::path::PathBuf;

use thiserror::Error;

/// The transport could not fetch or advance a page.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("browser automation failed: {0}")]
    Automation(String),

    #[error("page {url} has no usable next control")]
    NoNextPage { url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport already closed")]
    Closed,

    #[error(transparent)]
    Setup(#[from] ConfigurationError),
}

/// One listing fragment could not be turned into a raw record.
#[derive(Debug, Error)]
#[error("listing #{index}: {reason}")]
pub struct ExtractionFailure {
    /// Position of the fragment on its page, starting at 1.
    pub index: usize,
    pub reason: String,
}

/// Appending a page to the store failed.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A structural anchor the run depends on is missing; nothing was scraped.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("search form `{selector}` not found on {url}")]
    SearchFormMissing { selector: String, url: String },

    #[error("invalid selector `{0}`")]
    BadSelector(String),

    #[error("invalid URL `{url}`: {reason}")]
    BadUrl { url: String, reason: String },

    #[error("could not prepare store {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a run ended in the FAILED state.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transport(TransportError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl From<TransportError> for PipelineError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Setup(c) => PipelineError::Configuration(c),
            other => PipelineError::Transport(other),
        }
    }
}

impl PipelineError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::Configuration(_))
    }
}
