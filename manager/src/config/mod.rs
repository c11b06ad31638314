// File: manager/src/config/mod.rs
pub mod manager;
pub mod secrets;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::defaults;
use crate::errors::ConfigError;
use crate::scheduler::validate_6_field_cron;

pub use manager::ConfigManager;
pub use secrets::SecretsLoader;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub web_enabled: bool,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub alarm_webhook_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    pub portal: PortalConfig,
    #[serde(default)]
    pub schedules: ScheduleConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    // Populated from individual server config files
    #[serde(skip)]
    pub servers: HashMap<String, ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub token_url: String,
    pub username: String,
    // Resolved from secrets.toml
    #[serde(skip)]
    pub password: String,
    pub referer: Option<String>,
    #[serde(default = "default_token_expiration")]
    pub token_expiration_minutes: u32,
}

/// 6-field cron expressions (sec min hour day month dow). A missing entry
/// disables the job in service mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub usage_stats: Option<String>,
    pub service_status: Option<String>,
    pub clean_up: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_days_to_keep")]
    pub days_to_keep: u32,
    #[serde(default = "default_job_history_days")]
    pub job_history_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days_to_keep: defaults::DAYS_STATS_TO_KEEP,
            job_history_days: defaults::JOB_HISTORY_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    // Taken from the config file name
    #[serde(skip)]
    pub name: String,
    pub admin_url: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    #[serde(default = "default_short_time_period")]
    pub short_time_period_minutes: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_page_size")]
    pub log_page_size: u32,
    #[serde(default)]
    pub excluded_services: Vec<String>,
    #[serde(default = "default_true")]
    pub usage_stats_enabled: bool,
    #[serde(default = "default_true")]
    pub service_status_enabled: bool,
    #[serde(skip)]
    pub tables: TablesConfig,
}

/// Feature-service layer URLs that stat rows are written to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesConfig {
    pub stats_per_time_period: Option<String>,
    pub errors: Option<String>,
    pub warnings: Option<String>,
    pub services_requested: Option<String>,
    pub layers_drawn: Option<String>,
    pub avg_layer_draw_time: Option<String>,
    pub services_status: Option<String>,
    pub services_down: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfigFile {
    pub server: ServerConfig,
    #[serde(default)]
    pub tables: TablesConfig,
}

fn default_host() -> String {
    defaults::HOST.to_string()
}

fn default_port() -> u16 {
    defaults::PORT
}

fn default_true() -> bool {
    true
}

fn default_database_path() -> String {
    defaults::DATABASE_PATH.to_string()
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECONDS
}

fn default_token_expiration() -> u32 {
    defaults::PORTAL_TOKEN_EXPIRATION_MINUTES
}

fn default_days_to_keep() -> u32 {
    defaults::DAYS_STATS_TO_KEEP
}

fn default_job_history_days() -> u32 {
    defaults::JOB_HISTORY_DAYS
}

fn default_short_time_period() -> u32 {
    defaults::SHORT_TIME_PERIOD_MINUTES
}

fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}

fn default_log_page_size() -> u32 {
    defaults::LOG_PAGE_SIZE
}

impl Config {
    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.get(name)
    }

    /// Server names in a stable order
    pub fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.servers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check the merged configuration before any job runs
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "at least one server config file".to_string(),
            });
        }

        validate_url("portal.token_url", &self.portal.token_url)?;
        if self.portal.username.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "portal.username".to_string(),
            });
        }
        if self.portal.password.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "secrets portal.password".to_string(),
            });
        }

        if !self.alarm_webhook_url.is_empty() {
            validate_url("alarm_webhook_url", &self.alarm_webhook_url)?;
        }

        for (job, schedule) in [
            ("usage_stats", &self.schedules.usage_stats),
            ("service_status", &self.schedules.service_status),
            ("clean_up", &self.schedules.clean_up),
        ] {
            if let Some(schedule) = schedule {
                validate_6_field_cron(schedule).map_err(|e| ConfigError::InvalidValue {
                    field: format!("schedules.{}", job),
                    reason: e.to_string(),
                })?;
            }
        }

        if self.retention.days_to_keep == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retention.days_to_keep".to_string(),
                reason: "must be at least 1 day".to_string(),
            });
        }

        for name in self.server_names() {
            if let Some(server) = self.servers.get(&name) {
                server.validate()?;
            }
        }

        Ok(())
    }
}

impl ServerConfig {
    /// Build an admin API URL below `{admin_url}/admin/`
    pub fn admin_endpoint(&self, path: &str) -> String {
        let base = self.admin_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("{}/admin", base)
        } else {
            format!("{}/admin/{}", base, path)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = format!("{}.server", self.name);

        validate_url(&format!("{}.admin_url", prefix), &self.admin_url)?;

        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: format!("{}.username", prefix),
            });
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: format!("secrets servers.{}", self.name),
            });
        }
        if self.short_time_period_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.short_time_period_minutes", prefix),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.log_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.log_page_size", prefix),
                reason: "must be greater than zero".to_string(),
            });
        }

        for (table, url) in self.tables.all() {
            validate_url(&format!("{}.tables.{}", self.name, table), url)?;
        }

        Ok(())
    }
}

impl TablesConfig {
    /// Every configured table as (field name, url)
    pub fn all(&self) -> Vec<(&'static str, &str)> {
        [
            ("stats_per_time_period", &self.stats_per_time_period),
            ("errors", &self.errors),
            ("warnings", &self.warnings),
            ("services_requested", &self.services_requested),
            ("layers_drawn", &self.layers_drawn),
            ("avg_layer_draw_time", &self.avg_layer_draw_time),
            ("services_status", &self.services_status),
            ("services_down", &self.services_down),
        ]
        .into_iter()
        .filter_map(|(name, url)| url.as_deref().map(|url| (name, url)))
        .collect()
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingRequired {
            field: field.to_string(),
        });
    }

    let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
