//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`irk.{profile}.toml`)
//! 4. Main config file (`irk.toml` / `config.toml`)
//! 5. Environment variables (`IRK_*`)
//!
//! # Feature Flags
//!
//! - `toml-config`: enables TOML configuration files
//! - `yaml-config`: enables YAML configuration files (`irk.yaml`, `irk.yml`, ...)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `IRK_` prefix with `__` as the separator:
//!
//! - `IRK_SERVER__NICK=irkbot` → `server.nick = "irkbot"`
//! - `IRK_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! use irk_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./irk.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::IrkConfig;

/// File stems searched for, in order.
const FILE_STEMS: &[&str] = &["irk", "config"];

/// A configuration file format enabled at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    const ENABLED: &'static [Self] = &[
        #[cfg(feature = "toml-config")]
        Self::Toml,
        #[cfg(feature = "yaml-config")]
        Self::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads the profile from `IRK_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("IRK_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<user config dir>/irk` to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(config_dir) => self.search_path(config_dir.join("irk")),
            None => self,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: IrkConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<IrkConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;
        let config: IrkConfig = figment.extract()?;

        debug!(
            profile = %profile,
            nick = %config.server.nick,
            packages = config.modules.load.len(),
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(IrkConfig::default()))
            .merge(std::mem::take(&mut self.figment));

        match &self.config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.clone()));
                }
                let format = FileFormat::from_path(path).ok_or_else(|| {
                    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                    ConfigError::UnsupportedFormat(ext.to_string())
                })?;
                info!(path = %path.display(), "Loading configuration file");
                figment = format.merge_into(figment, path);
            }
            None => figment = self.merge_discovered(figment),
        }

        if self.load_env {
            trace!("Loading environment variables with IRK_ prefix");
            figment = figment.merge(Env::prefixed("IRK_").ignore(&["PROFILE"]).split("__"));
        }

        Ok(figment)
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("irk")))
            .collect()
    }

    /// Finds the first `{stem}.{ext}` per enabled format across the search
    /// paths, preceded by its `{stem}.{profile}.{ext}` sibling if present.
    fn discover(&self) -> Vec<(FileFormat, PathBuf)> {
        let search_paths = self.resolve_search_paths();
        let mut found = Vec::new();

        for &format in FileFormat::ENABLED {
            let candidates = search_paths.iter().flat_map(|dir| {
                FILE_STEMS.iter().flat_map(move |stem| {
                    format
                        .extensions()
                        .iter()
                        .map(move |ext| (dir.join(format!("{stem}.{ext}")), *stem, *ext))
                })
            });

            for (path, stem, ext) in candidates {
                if !path.exists() {
                    continue;
                }
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                let profiled = dir.join(format!("{stem}.{}.{ext}", self.profile));
                if profiled.exists() {
                    found.push((format, profiled));
                }
                found.push((format, path));
                break;
            }
        }
        found
    }

    fn merge_discovered(&self, mut figment: Figment) -> Figment {
        let files = self.discover();
        if files.is_empty() {
            warn!("No configuration file found, using defaults");
        }
        for (format, path) in files {
            debug!(path = %path.display(), "Loading configuration file");
            figment = format.merge_into(figment, &path);
        }
        figment
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<IrkConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<IrkConfig> {
    ConfigLoader::new().file(path).load()
}
