use serde::{Deserialize, Serialize};
use std::env::var;
use std::path::PathBuf;

/// Immutable service configuration, established once at startup and shared
/// by reference with every connection handler.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Directory beneath which every servable repository must reside.
    pub repo_root: PathBuf,
    /// Server host key, OpenSSH private-key format.
    pub host_key: PathBuf,
    /// The upload-pack executable to run for each fetch.
    pub upload_pack_bin: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 2221,
            repo_root: PathBuf::from("./repos"),
            host_key: PathBuf::from("./id_rsa"),
            upload_pack_bin: PathBuf::from("/usr/bin/git-upload-pack"),
        }
    }
}

impl GatewayConfig {
    /// Loads the configuration from the file named by `CONFIG_FILE`
    /// (default `config.toml`). A missing file is replaced with the saved
    /// default configuration; an unparsable file is a startup error.
    pub fn load() -> Result<Self, crate::error::GitGateError> {
        let config_file_path = var("CONFIG_FILE").unwrap_or("config.toml".to_string());
        let config_content = match std::fs::read_to_string(&config_file_path) {
            Ok(content) => content,
            Err(_) => {
                let config = Self::default();
                config.save()?;
                return Ok(config);
            }
        };
        toml::from_str(&config_content).map_err(|e| {
            crate::error::GitGateError::ConfigError(format!(
                "could not parse {}: {}",
                config_file_path, e
            ))
        })
    }

    pub fn save(&self) -> Result<(), crate::error::GitGateError> {
        let config_file_path = var("CONFIG_FILE").unwrap_or("config.toml".to_string());
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GitGateError::ConfigError(format!("{}", e)))?;
        std::fs::write(config_file_path, toml_str)?;
        Ok(())
    }
}
