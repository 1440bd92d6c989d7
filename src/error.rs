//! Error types for StrataLog
//!
//! This module defines the error types used throughout the crate. Emission
//! itself never fails: these errors surface from configuration loading,
//! topology construction and direct sink operations.

use thiserror::Error;

/// Main error type for StrataLog operations
#[derive(Error, Debug)]
pub enum StrataLogError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigFileMissing(String),

    /// I/O errors (file operations)
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    /// Key-value configuration source errors
    #[error("Configuration source error: {source}")]
    SourceError {
        #[from]
        source: ::config::ConfigError,
    },

    /// File rotation errors
    #[error("File rotation error: {0}")]
    RotationError(String),

    /// Sink-related errors
    #[error("Sink error: {0}")]
    SinkError(String),

    /// Tracing subscriber errors
    #[error("Tracing error: {0}")]
    TracingError(String),
}

/// Result type alias for StrataLog operations
pub type Result<T> = std::result::Result<T, StrataLogError>;

impl StrataLogError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new rotation error
    pub fn rotation<S: Into<String>>(msg: S) -> Self {
        Self::RotationError(msg.into())
    }

    /// Create a new sink error
    pub fn sink<S: Into<String>>(msg: S) -> Self {
        Self::SinkError(msg.into())
    }

    /// Create a new tracing error
    pub fn tracing<S: Into<String>>(msg: S) -> Self {
        Self::TracingError(msg.into())
    }
}

impl From<crate::sinks::SinkError> for StrataLogError {
    fn from(err: crate::sinks::SinkError) -> Self {
        match err {
            crate::sinks::SinkError::Io(source) => Self::IoError { source },
            other => Self::SinkError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let config_err = StrataLogError::config("Invalid configuration");
        assert!(matches!(config_err, StrataLogError::ConfigError(_)));
        assert_eq!(
            config_err.to_string(),
            "Configuration error: Invalid configuration"
        );

        let rotation_err = StrataLogError::rotation("rename failed");
        assert_eq!(rotation_err.to_string(), "File rotation error: rename failed");
    }

    #[test]
    fn test_error_from_conversions() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let err: StrataLogError = io_error.into();
        assert!(matches!(err, StrataLogError::IoError { .. }));

        let source_error = ::config::Config::builder()
            .set_override("log.rotate.max_size", "lots")
            .unwrap()
            .build()
            .unwrap()
            .get::<u64>("log.rotate.max_size")
            .unwrap_err();
        let err: StrataLogError = source_error.into();
        assert!(matches!(err, StrataLogError::SourceError { .. }));
    }

    #[test]
    fn test_sink_error_conversion_keeps_io_source() {
        let sink_err = crate::sinks::SinkError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "Access denied",
        ));
        let err: StrataLogError = sink_err.into();
        assert!(matches!(err, StrataLogError::IoError { .. }));
        assert!(err.to_string().contains("Access denied"));

        let err: StrataLogError = crate::sinks::SinkError::Closed.into();
        assert!(matches!(err, StrataLogError::SinkError(_)));
    }

    #[test]
    fn test_unicode_error_message() {
        let unicode_msg = "配置错误: 无效的参数 🚫";
        let err = StrataLogError::config(unicode_msg);
        assert!(err.to_string().contains(unicode_msg));
    }

    #[test]
    fn test_error_debug_format() {
        let err = StrataLogError::config("test error");
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("ConfigError"));
        assert!(debug_str.contains("test error"));
    }
}
