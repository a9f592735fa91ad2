//! Configuration for the irk runtime.
//!
//! Connection settings, the package allow and block lists, per-package option
//! overrides and logging, loaded from TOML/YAML files and `IRK_*` environment
//! variables through figment.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    IrkConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ModulesConfig,
    ServerConfig, SpanEventConfig,
};
pub use validation::validate_config;
