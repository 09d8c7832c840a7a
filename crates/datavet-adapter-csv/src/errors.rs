//! Error types for the CSV adapter with context

use thiserror::Error;

/// Errors that can occur when reading delimited text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsvError {
    /// CSV read error with context
    #[error("CSV read error at line {line}: {message}")]
    Read { line: usize, message: String },

    /// I/O error
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CsvError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for CsvError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<csv::Error> for CsvError {
    fn from(e: csv::Error) -> Self {
        let line = e
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .unwrap_or(0);
        Self::Read {
            line,
            message: e.to_string(),
        }
    }
}

/// Result type alias for CSV operations
pub type CsvResult<T> = std::result::Result<T, CsvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CsvError::Read {
            line: 3,
            message: "unexpected quote".into(),
        };
        assert_eq!(err.to_string(), "CSV read error at line 3: unexpected quote");
        assert_eq!(
            CsvError::config("bad delimiter").to_string(),
            "Configuration error: bad delimiter"
        );
    }
}
