//! Engine Errors
//!
//! One error type for both pipelines. Per-call failures (parse, format, io)
//! are returned to the immediate caller; initialization failures are
//! returned from the engine constructor.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the template engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// The binding context could not be built from the configuration
    #[error("engine initialization failed: {0}")]
    Initialization(String),

    /// Template text is not well-formed for the structural binding
    #[error("{}", parse_message(message, *position))]
    Parse {
        message: String,
        /// Byte offset into the normalized text, when the reader reports one
        position: Option<u64>,
    },

    /// Marshaling a tree to text failed
    #[error("marshal failed: {0}")]
    Format(String),

    /// Re-reading marshaled text for indentation failed
    #[error("pretty print failed on marshaled output: {0}")]
    PrettyPrint(String),

    /// Template file bytes could not be decoded to text
    #[error("cannot decode {}: {message}", path.display())]
    Encoding { path: PathBuf, message: String },

    /// Reading a template file failed
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn parse_message(message: &str, position: Option<u64>) -> String {
    match position {
        Some(pos) => format!("unmarshal failed at byte {}: {}", pos, message),
        None => format!("unmarshal failed: {}", message),
    }
}

impl EngineError {
    pub(crate) fn parse(message: impl Into<String>, position: Option<u64>) -> Self {
        EngineError::Parse {
            message: message.into(),
            position,
        }
    }

    /// Check whether this error came from unmarshaling template text
    pub fn is_parse(&self) -> bool {
        matches!(self, EngineError::Parse { .. })
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_with_position() {
        let err = EngineError::parse("Unclosed tag: <body>", Some(42));
        assert_eq!(err.to_string(), "unmarshal failed at byte 42: Unclosed tag: <body>");
        assert!(err.is_parse());
    }

    #[test]
    fn test_io_message_names_path() {
        let err = EngineError::Io {
            path: PathBuf::from("missing.html"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().starts_with("cannot read missing.html"));
        assert!(!err.is_parse());
    }
}
