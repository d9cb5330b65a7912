//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// File name looked up beside the running executable.
pub const CONFIG_FILE_NAME: &str = "env.conf";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ServerConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load configuration, falling back to defaults on any problem.
///
/// A missing, unreadable, malformed or invalid file is logged as a warning
/// and never aborts startup.
pub fn load_or_default(path: &Path) -> ServerConfig {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "Config file does not exist, using default values"
        );
        return ServerConfig::default();
    }

    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), env = %config.env, "Config loaded");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Cannot read config file, using default values"
            );
            ServerConfig::default()
        }
    }
}

/// `env.conf` in the directory of the running executable.
///
/// Falls back to a relative `env.conf` when the executable path is unknown.
pub fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_or_default(&tmp.path().join(CONFIG_FILE_NAME));
        assert_eq!(config.http_server.port, 443);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "http_server = [not toml").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
        assert_eq!(load_or_default(&path).http_server.address, "[::]");
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[http_server]\naddress = \"0.0.0.0\"\nport = 8443\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
        assert_eq!(load_or_default(&path).http_server.port, 443);
    }

    #[test]
    fn valid_file_is_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "env = \"staging\"\n[http_server]\nport = 8443\n").unwrap();

        let config = load_or_default(&path);
        assert_eq!(config.env, "staging");
        assert_eq!(config.http_server.port, 8443);
    }

    #[test]
    fn default_path_uses_file_name() {
        assert!(default_config_path().ends_with(CONFIG_FILE_NAME));
    }
}
