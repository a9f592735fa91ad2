//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating an [`IrkConfig`](super::IrkConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The extension does not belong to an enabled format feature.
    #[error("unsupported configuration format `.{0}` (is the matching feature enabled?)")]
    UnsupportedFormat(String),

    /// A source could not be read or did not fit the schema.
    #[error("cannot read configuration: {0}")]
    Extract(Box<figment::Error>),

    #[error("`{0}` must be set")]
    Missing(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Extract(Box::new(e))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
