//! Error types for annotation format operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::AnnotationError;

/// Errors that can occur during annotation format operations.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML deserialization error
    #[error("XML error: {0}")]
    XmlDe(#[from] quick_xml::DeError),

    /// Malformed content in an imported file
    #[error("{}: {message}", location(.path, .line))]
    Parse {
        /// File being read
        path: PathBuf,
        /// 1-based line number, when known
        line: Option<usize>,
        /// What was wrong
        message: String,
    },

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Export was cancelled before it was committed
    #[error("Export cancelled")]
    Cancelled,

    /// No format registered under this id
    #[error("Unknown format: {id}")]
    UnknownFormat {
        /// Requested id
        id: String,
    },

    /// Imported data violates a model rule
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

fn location(path: &std::path::Path, line: &Option<usize>) -> String {
    match line {
        Some(line) => format!("{}:{}", path.display(), line),
        None => path.display().to_string(),
    }
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a parse error pointing at a file and optional line.
    pub fn parse(path: impl Into<PathBuf>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
