//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use irk_framework::PackageOptions;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IrkConfig {
    /// Connection settings handed to the transport.
    #[serde(default)]
    pub server: ServerConfig,

    /// Which packages to load, and their option overrides.
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Server
// =============================================================================

/// IRC connection settings.
///
/// The runtime itself only reads `nick`; the rest is for the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Nick to register with.
    #[serde(default = "default_nick")]
    pub nick: String,

    /// Ident (user name) sent in `USER`.
    #[serde(default = "default_nick")]
    pub ident: String,

    /// Real name sent in `USER`.
    #[serde(default = "default_realname")]
    pub name: String,

    /// Server host name.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect over TLS.
    #[serde(default)]
    pub ssl: bool,

    /// Server password (`PASS`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Character encoding of the wire.
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            ident: default_nick(),
            name: default_realname(),
            host: default_host(),
            port: default_port(),
            ssl: false,
            password: None,
            encoding: default_encoding(),
        }
    }
}

fn default_nick() -> String {
    "irk".to_string()
}

fn default_realname() -> String {
    "irk bot".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6667
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

// =============================================================================
// Modules
// =============================================================================

/// Package selection.
///
/// A package is loaded at startup only if it is listed in `load` and not in
/// `block`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Packages to load.
    #[serde(default)]
    pub load: Vec<String>,

    /// Packages never loaded at startup, even when listed in `load`.
    #[serde(default)]
    pub block: Vec<String>,

    /// Option values per package, replacing declared defaults.
    ///
    /// ```toml
    /// [modules.options.greet]
    /// greeting = "ahoy"
    /// ```
    #[serde(default)]
    pub options: PackageOptions,
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Rotation policy for file output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-target levels, e.g. `irk_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of each event.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,
}
