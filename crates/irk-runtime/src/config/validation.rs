//! Checks a loaded configuration before the runtime starts.

use tracing::warn;

use super::error::{ConfigError, ConfigResult};
use super::schema::{IrkConfig, LogOutput, LoggingConfig, ModulesConfig, ServerConfig};

/// Validates the entire configuration.
///
/// Hard errors stop the bot from starting; suspicious but harmless settings
/// are only logged.
pub fn validate_config(config: &IrkConfig) -> ConfigResult<()> {
    validate_server(&config.server)?;
    validate_modules(&config.modules)?;
    validate_logging(&config.logging)
}

fn validate_server(server: &ServerConfig) -> ConfigResult<()> {
    if server.nick.is_empty() {
        return Err(ConfigError::Missing("server.nick"));
    }
    if server.nick.contains(char::is_whitespace) {
        return Err(ConfigError::invalid("server.nick", "nicks cannot contain whitespace"));
    }
    if server.ident.is_empty() {
        return Err(ConfigError::Missing("server.ident"));
    }
    if server.host.is_empty() {
        return Err(ConfigError::Missing("server.host"));
    }
    if server.port == 0 {
        return Err(ConfigError::invalid("server.port", "port 0 is not connectable"));
    }
    Ok(())
}

fn validate_modules(modules: &ModulesConfig) -> ConfigResult<()> {
    if modules.load.iter().chain(&modules.block).any(String::is_empty) {
        return Err(ConfigError::invalid("modules", "package names cannot be empty"));
    }

    for name in modules.load.iter().filter(|n| modules.block.contains(n)) {
        warn!(package = %name, "Package is both loaded and blocked; it will not be loaded");
    }
    for name in modules.options.keys().filter(|n| !modules.load.contains(n)) {
        warn!(package = %name, "Options given for a package that is not in the load list");
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::Missing("logging.file_path"));
    }
    if logging.filters.keys().any(String::is_empty) {
        return Err(ConfigError::invalid("logging.filters", "targets cannot be empty"));
    }
    Ok(())
}
