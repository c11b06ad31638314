// File: manager/src/config/manager.rs
use super::{Config, SecretsLoader, ServerConfig, ServerConfigFile};
use crate::errors::ConfigError;
use anyhow::{anyhow, Result};
use glob::glob;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const MAIN_CONFIG_FILE: &str = "main.toml";
const SECRETS_FILE: &str = "secrets.toml";

/// Holds the configuration loaded at startup.
///
/// A config directory contains `main.toml`, `secrets.toml` and one
/// `<server>.toml` per GIS server.
pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: &str) -> Result<Self> {
        let config = Self::load_configuration(Path::new(config_dir)).await?;
        config.validate()?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &Path) -> Result<Config> {
        let mut config: Config = read_toml(&config_dir.join(MAIN_CONFIG_FILE)).await?;
        config.servers = Self::load_servers(config_dir).await?;

        let secrets = SecretsLoader::load(&config_dir.join(SECRETS_FILE)).await?;
        let missing = secrets.apply(&mut config);
        if !missing.is_empty() {
            warn!("No admin password in {} for: {}", SECRETS_FILE, missing.join(", "));
        }

        info!(
            "Loaded {} servers ({}) with {} configured tables",
            config.servers.len(),
            config.server_names().join(", "),
            config
                .servers
                .values()
                .map(|s| s.tables.all().len())
                .sum::<usize>()
        );

        Ok(config)
    }

    async fn load_servers(config_dir: &Path) -> Result<HashMap<String, ServerConfig>> {
        let pattern = config_dir.join("*.toml");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| anyhow!("Config path is not valid UTF-8: {}", config_dir.display()))?;

        let mut servers = HashMap::new();
        for entry in glob(pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let Some(name) = server_name(&path) else {
                continue;
            };

            debug!("Loading server config: {}", path.display());
            let file: ServerConfigFile = read_toml(&path).await?;

            let mut server = file.server;
            server.name = name.clone();
            server.tables = file.tables;
            servers.insert(name, server);
        }

        Ok(servers)
    }
}

/// Server name for a `*.toml` path, `None` for the shared files
fn server_name(path: &Path) -> Option<String> {
    let filename = path.file_name()?.to_str()?;
    if filename == MAIN_CONFIG_FILE || filename == SECRETS_FILE {
        return None;
    }
    filename.strip_suffix(".toml").map(str::to_string)
}

async fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::LoadFailed {
            path: display.clone(),
            reason: e.to_string(),
        })?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: display,
        reason: e.to_string(),
    })
}
