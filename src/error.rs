use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybookError {
    #[error("Source file not found: {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Required column missing: {column}")]
    MissingColumn { column: String },

    #[error("Table row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("No merchant registered under code: {0}")]
    MerchantNotFound(String),

    #[error("Narrative generation failed: {0}")]
    NarrativeRender(String),

    #[error("Narrative generation timed out after {seconds}s")]
    NarrativeTimeout { seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

#[cfg(feature = "gemini")]
impl From<reqwest::Error> for PlaybookError {
    fn from(err: reqwest::Error) -> Self {
        PlaybookError::Http(err.to_string())
    }
}

impl PlaybookError {
    /// Whether the condition only affects the current query or template,
    /// as opposed to failing the whole request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlaybookError::MerchantNotFound(_)
                | PlaybookError::NarrativeRender(_)
                | PlaybookError::NarrativeTimeout { .. }
                | PlaybookError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PlaybookError>;
