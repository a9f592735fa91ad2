//! Unified error types for the irk core.
//!
//! Every failure the framework can observe while loading or running handlers
//! has a variant here. None of them is fatal: the loader and dispatcher log
//! them and skip the offending unit.

use serde_json::Value;
use thiserror::Error;

use crate::config::OptionType;

/// Boxed error returned by handler bodies and constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by the outbound bot capabilities.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The transport is not connected.
    #[error("bot is not connected")]
    NotConnected,

    /// The transport refused or dropped the outbound line.
    #[error("failed to send line: {0}")]
    SendFailed(String),

    /// The capability is not provided by this bot implementation.
    #[error("capability '{0}' is not supported by this bot")]
    Unsupported(&'static str),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

// =============================================================================
// Config Errors
// =============================================================================

/// A declared option value does not satisfy its expected type.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The supplied value is not an instance of the expected type.
    #[error("config option {option} needs {expected}, but {actual} given")]
    TypeMismatch {
        /// Option name.
        option: String,
        /// Declared type.
        expected: OptionType,
        /// The value that failed the check.
        actual: Value,
    },
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors raised while turning a package's handler constructors into
/// registry entries.
///
/// Each error concerns a single handler (or, for `PackageNotFound`, a single
/// package); the loader never lets one of these abort sibling units.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The module source has no package with this name.
    #[error("package '{0}' not found in module source")]
    PackageNotFound(String),

    /// The handler's declared configuration failed validation.
    #[error("cannot configure {handler} from {package}: {source}")]
    Config {
        package: String,
        handler: String,
        #[source]
        source: ConfigError,
    },

    /// A selected handler name is not exported by the package.
    #[error("package {package} has no handler named {handler}")]
    HandlerNotFound { package: String, handler: String },

    /// The handler constructor returned an error or panicked.
    #[error("cannot construct {handler} from {package}: {reason}")]
    Construction {
        package: String,
        handler: String,
        reason: String,
    },

    /// The handler constructor succeeded but produced no handler.
    #[error("constructor for {handler} from {package} produced nothing")]
    NothingConstructed { package: String, handler: String },

    /// The handler's rule is not a valid pattern.
    #[error("invalid rule {rule:?} for {handler} from {package}: {source}")]
    Pattern {
        package: String,
        handler: String,
        rule: String,
        #[source]
        source: regex::Error,
    },
}

impl LoadError {
    /// Returns the handler name this error concerns, if any.
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::PackageNotFound(_) => None,
            Self::Config { handler, .. }
            | Self::HandlerNotFound { handler, .. }
            | Self::Construction { handler, .. }
            | Self::NothingConstructed { handler, .. }
            | Self::Pattern { handler, .. } => Some(handler),
        }
    }
}

// =============================================================================
// Handler Errors
// =============================================================================

/// A failure raised while a handler's `run` was executing.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// `run` returned an error.
    #[error("handler failed: {0}")]
    Failed(#[source] BoxError),

    /// `run` panicked; the payload message is preserved when it is a string.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Builds a [`HandlerError::Panicked`] from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        Self::Panicked(panic_message(payload.as_ref()))
    }
}

/// Extracts the message from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for outbound API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for config validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for handler loading.
pub type LoadResult<T> = Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(HandlerError::from_panic(s).to_string(), "handler panicked: boom");

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned.as_ref()), "owned boom");

        let other: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_load_error_handler_name() {
        let err = LoadError::NothingConstructed {
            package: "greet".into(),
            handler: "Hello".into(),
        };
        assert_eq!(err.handler(), Some("Hello"));
        assert_eq!(LoadError::PackageNotFound("x".into()).handler(), None);
    }
}
