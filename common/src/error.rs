//! Error handling for the load harness.
//!
//! Every failure the harness can report is a [`LoadError`]. The driver only
//! needs to tell configuration problems (print usage, exit 1, touch nothing)
//! apart from everything else, which is what [`ErrorCategory`] is for.

use thiserror::Error;

/// Error type shared by the option framework, topology builders and the engine.
#[derive(Error, Debug)]
pub enum LoadError {
    /// A user-facing configuration problem: a missing required flag, no work
    /// selected, a malformed property pair or an unknown platform.
    #[error("{message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// An integer or float flag whose argument could not be parsed.
    #[error("invalid value '{value}' for option {option}, expected {expected}")]
    InvalidValue {
        option: String,
        value: String,
        expected: &'static str,
    },

    #[error("Topology build failed: {message}")]
    BuildError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Execution failed: {message}")]
    ExecutionError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Raised on purpose by the crash-testing operators.
    #[error("Deliberate failure: {message}")]
    BreakingError { message: String },

    #[error("IO operation failed: {message}")]
    IoError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Result type alias for load operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Coarse grouping of [`LoadError`] kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Detected before any work is submitted
    Configuration,
    /// A topology could not be assembled
    Build,
    /// A submitted flow failed while running
    Execution,
    /// Filesystem and other resource failures
    Resource,
}

impl LoadError {
    /// Create a configuration error with a custom message.
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with a custom message and source error.
    pub fn configuration_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an invalid value error for the given option spelling.
    pub fn invalid_value<O: Into<String>, V: Into<String>>(
        option: O,
        value: V,
        expected: &'static str,
    ) -> Self {
        Self::InvalidValue {
            option: option.into(),
            value: value.into(),
            expected,
        }
    }

    /// Create a build error with a custom message.
    pub fn build_error<S: Into<String>>(message: S) -> Self {
        Self::BuildError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a build error with a custom message and source error.
    pub fn build_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::BuildError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an execution error with a custom message.
    pub fn execution_error<S: Into<String>>(message: S) -> Self {
        Self::ExecutionError {
            message: message.into(),
            source: None,
        }
    }

    /// Create an execution error with a custom message and source error.
    pub fn execution_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::ExecutionError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a deliberate failure error.
    pub fn breaking_error<S: Into<String>>(message: S) -> Self {
        Self::BreakingError {
            message: message.into(),
        }
    }

    /// Create an IO error with a custom message.
    pub fn io_error<S: Into<String>>(message: S) -> Self {
        Self::IoError {
            message: message.into(),
            source: None,
        }
    }

    /// Create an IO error with a custom message and source error.
    pub fn io_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::IoError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError { .. } | Self::InvalidValue { .. } => {
                ErrorCategory::Configuration
            }
            Self::BuildError { .. } => ErrorCategory::Build,
            Self::ExecutionError { .. } | Self::BreakingError { .. } => ErrorCategory::Execution,
            Self::IoError { .. } => ErrorCategory::Resource,
        }
    }

    /// True for errors the driver reports as "options error" followed by usage.
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// True when this error, or any error it wraps, was raised by a crash-testing operator.
    pub fn is_deliberate(&self) -> bool {
        match self {
            Self::BreakingError { .. } => true,
            Self::ExecutionError {
                source: Some(source),
                ..
            } => source
                .chain()
                .any(|cause| matches!(cause.downcast_ref::<LoadError>(), Some(e) if e.is_deliberate())),
            _ => false,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::io_error_with_source(err.to_string(), err)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::io_error_with_source("JSON encoding failed", err)
    }
}

/// Extension trait for attaching context while converting foreign errors.
pub mod context {
    use super::{LoadError, Result};

    /// Trait for adding context to errors.
    pub trait ErrorContext<T> {
        /// Wrap the error as an IO error described by `f`.
        fn with_io_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;

        /// Wrap the error as a build error described by `f`.
        fn with_build_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;

        /// Wrap the error as an execution error described by `f`.
        fn with_execution_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;
    }

    impl<T, E> ErrorContext<T> for std::result::Result<T, E>
    where
        E: Into<anyhow::Error>,
    {
        fn with_io_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| LoadError::io_error_with_source(f(), e.into()))
        }

        fn with_build_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| LoadError::build_error_with_source(f(), e.into()))
        }

        fn with_execution_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| LoadError::execution_error_with_source(f(), e.into()))
        }
    }
}

pub use context::ErrorContext;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::error::Error;

    #[test]
    fn test_error_creation() {
        let config_error = LoadError::configuration_error("The -I option is required");
        assert!(matches!(config_error, LoadError::ConfigurationError { .. }));
        assert_eq!(config_error.to_string(), "The -I option is required");

        let build_error = LoadError::build_error_with_source("bad pipe", anyhow!("unbound head"));
        assert!(matches!(build_error, LoadError::BuildError { .. }));
        assert!(build_error.source().is_some());
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            LoadError::configuration_error("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            LoadError::invalid_value("-gf", "abc", "an integer").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(LoadError::build_error("x").category(), ErrorCategory::Build);
        assert_eq!(
            LoadError::breaking_error("x").category(),
            ErrorCategory::Execution
        );
        assert_eq!(LoadError::io_error("x").category(), ErrorCategory::Resource);

        assert!(LoadError::invalid_value("-gs", "1.x", "a number").is_configuration());
        assert!(!LoadError::execution_error("x").is_configuration());
    }

    #[test]
    fn test_invalid_value_message() {
        let err = LoadError::invalid_value("-gf", "three", "an integer");
        assert_eq!(
            err.to_string(),
            "invalid value 'three' for option -gf, expected an integer"
        );
    }

    #[test]
    fn test_deliberate_through_execution_error() {
        let inner = LoadError::breaking_error("event threshold reached");
        let outer = LoadError::execution_error_with_source("flow failed", inner);
        assert!(outer.is_deliberate());
        assert!(!LoadError::execution_error("other").is_deliberate());
    }

    #[test]
    fn test_error_context_extension() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result
            .with_io_context(|| "reading input/".to_string())
            .unwrap_err();
        assert!(matches!(err, LoadError::IoError { .. }));
        assert_eq!(err.to_string(), "IO operation failed: reading input/");
    }
}
