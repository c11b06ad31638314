//! Passwords for the GIS servers and the portal.
//!
//! Kept in `secrets.toml` next to the other config files so they can stay out
//! of version control. Server files only name the admin user; the password is
//! keyed by server name (the server file's stem).
//!
//! ```toml
//! [servers]
//! intgis = "admin-password-1"
//! publicgis = "admin-password-2"
//!
//! [portal]
//! password = "portal-password"
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use super::Config;
use crate::errors::ConfigError;

#[derive(Debug, Deserialize, Default)]
pub struct SecretsFile {
    #[serde(default)]
    pub servers: HashMap<String, String>,
    #[serde(default)]
    pub portal: PortalSecrets,
}

#[derive(Debug, Deserialize, Default)]
pub struct PortalSecrets {
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct SecretsLoader {
    secrets: SecretsFile,
}

impl SecretsLoader {
    /// Read `secrets.toml`. A missing file yields no secrets; validation
    /// later reports whichever password is needed.
    pub async fn load(secrets_path: &Path) -> Result<Self, ConfigError> {
        let path = secrets_path.display().to_string();

        let content = match fs::read_to_string(secrets_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No secrets file at {}", path);
                return Ok(Self {
                    secrets: SecretsFile::default(),
                });
            }
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        let secrets = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            reason: e.to_string(),
        })?;

        Ok(Self { secrets })
    }

    pub fn server_password(&self, server_name: &str) -> Option<&str> {
        self.secrets.servers.get(server_name).map(String::as_str)
    }

    pub fn portal_password(&self) -> Option<&str> {
        self.secrets.portal.password.as_deref()
    }

    /// Fill in the portal and server passwords. Returns the servers that
    /// have no password entry.
    pub fn apply(&self, config: &mut Config) -> Vec<String> {
        if let Some(password) = self.portal_password() {
            config.portal.password = password.to_string();
        } else {
            warn!("No portal password in secrets");
        }

        let mut missing = Vec::new();
        for (name, server) in config.servers.iter_mut() {
            match self.server_password(name) {
                Some(password) => server.password = password.to_string(),
                None => missing.push(name.clone()),
            }
        }
        missing.sort();

        for name in self.secrets.servers.keys() {
            if !config.servers.contains_key(name) {
                debug!("Secret for '{}' has no matching server file", name);
            }
        }

        missing
    }
}
