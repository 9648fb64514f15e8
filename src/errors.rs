use std::fmt;

/// Error types for the game-record pipeline
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// File I/O operation failed
    IoError(String),
    /// A single raw game entry could not be turned into a record
    MalformedEntry { index: usize, reason: String },
    /// Configuration error
    ConfigurationError(String),
    /// Validation error with context
    ValidationError {
        field: String,
        value: String,
        expected: String,
    },
    /// Table export or config (de)serialization failed
    SerializationError(String),
    /// Chained error with context
    ChainedError {
        source: Box<AnalysisError>,
        context: String,
    },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::IoError(msg) => write!(f, "I/O error: {}", msg),
            AnalysisError::MalformedEntry { index, reason } => {
                write!(f, "Malformed game entry #{}: {}", index, reason)
            }
            AnalysisError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AnalysisError::ValidationError {
                field,
                value,
                expected,
            } => {
                write!(
                    f,
                    "Validation failed for field '{}': got '{}', expected '{}'",
                    field, value, expected
                )
            }
            AnalysisError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AnalysisError::ChainedError { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

// Convenience type alias
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl From<std::io::Error> for AnalysisError {
    fn from(error: std::io::Error) -> Self {
        AnalysisError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(error: serde_json::Error) -> Self {
        AnalysisError::SerializationError(format!("JSON: {}", error))
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(error: csv::Error) -> Self {
        AnalysisError::SerializationError(format!("CSV: {}", error))
    }
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::errors::AnalysisError::ConfigurationError($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::AnalysisError::ConfigurationError(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! validation_error {
    ($field:expr, $value:expr, $expected:expr) => {
        $crate::errors::AnalysisError::ValidationError {
            field: $field.to_string(),
            value: $value.to_string(),
            expected: $expected.to_string(),
        }
    };
}

#[macro_export]
macro_rules! add_context {
    ($result:expr, $context:expr) => {
        $result.map_err(|e| $crate::errors::AnalysisError::ChainedError {
            source: Box::new(e),
            context: $context.to_string(),
        })
    };
}
