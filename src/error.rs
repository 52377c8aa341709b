//! Error types for embedding evaluation.

use std::path::PathBuf;

/// Errors raised while loading inputs or computing a benchmark metric.
///
/// Every variant is fatal for the current evaluation run. Recoverable
/// omissions (NaN rows under the skip policy, uncovered test pairs, unknown
/// tokens) are counted by the caller and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed header, wrong field count, unparseable number or bad label.
    #[error("{}:{line}: {message}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Predicted and ground-truth sequences disagree in length.
    #[error("alignment mismatch: expected {expected} entries, got {actual}")]
    Alignment { expected: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        EvalError::Format {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_names_line() {
        let err = EvalError::format("vec.txt", 4, "expected 3 fields, found 2");
        assert_eq!(err.to_string(), "vec.txt:4: expected 3 fields, found 2");
    }

    #[test]
    fn test_alignment_message() {
        let err = EvalError::Alignment { expected: 10, actual: 9 };
        assert!(err.to_string().contains("expected 10"));
    }
}
