#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("line {line}: {source}")]
    InvalidRow {
        line: usize,
        #[source]
        source: review_types::TextError,
    },
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to create output directory: {0}")]
    OutputDirCreation(std::io::Error),
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to serialize results: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize results: {0}")]
    Deserialization(serde_json::Error),
    #[error("response schema mismatch at {path}: {message}")]
    InvalidResponse { path: String, message: String },
}

pub type ReviewResult<T> = std::result::Result<T, ReviewError>;

impl ReviewError {
    /// Convert a `serde_path_to_error` failure into [`ReviewError::InvalidResponse`], naming the
    /// offending field path (or `<root>`).
    pub(crate) fn from_path_error(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        let message = err.into_inner().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        Self::InvalidResponse { path, message }
    }
}
