use std::fmt;

/// Failure persisting anchor history.
#[derive(Debug)]
pub enum HistoryError {
    /// The key/value backend rejected a read or write.
    Backend(Box<dyn std::error::Error + Send + Sync>),
    Encode(serde_json::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Backend(e) => write!(f, "history backend error: {e}"),
            HistoryError::Encode(e) => write!(f, "history encode error: {e}"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::Backend(e) => Some(e.as_ref()),
            HistoryError::Encode(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Encode(e)
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;
