//! Test configuration builder for creating test configs programmatically

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use gis_stats_manager::{Config, ConfigManager};

/// Builder for creating test configurations
pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main_config: MainConfigBuilder,
    server_configs: BTreeMap<String, ServerConfigBuilder>,
    write_secrets: bool,
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main_config: MainConfigBuilder::default(),
            server_configs: BTreeMap::new(),
            write_secrets: true,
        }
    }

    /// Configure main settings
    pub fn with_main_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MainConfigBuilder) -> MainConfigBuilder,
    {
        self.main_config = f(self.main_config);
        self
    }

    /// Add a server configuration
    pub fn with_server<F>(mut self, server_name: &str, f: F) -> Self
    where
        F: FnOnce(ServerConfigBuilder) -> ServerConfigBuilder,
    {
        let builder = f(ServerConfigBuilder::new(server_name));
        self.server_configs.insert(server_name.to_string(), builder);
        self
    }

    /// Do not write secrets.toml
    pub fn without_secrets(mut self) -> Self {
        self.write_secrets = false;
        self
    }

    /// Build and write config files to temp directory
    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        let database_path = self.temp_dir.path().join("data").join("stats.db");
        let main_toml = self.main_config.to_toml(&database_path.display().to_string());
        fs::write(config_dir.join("main.toml"), main_toml).expect("Failed to write main.toml");

        for (name, builder) in &self.server_configs {
            fs::write(config_dir.join(format!("{}.toml", name)), builder.to_toml())
                .expect("Failed to write server config");
        }

        if self.write_secrets {
            let mut secrets = String::from("[servers]\n");
            for (name, builder) in &self.server_configs {
                secrets.push_str(&format!("{} = \"{}\"\n", name, builder.password));
            }
            secrets.push_str(&format!(
                "\n[portal]\npassword = \"{}\"\n",
                self.main_config.portal_password
            ));
            fs::write(config_dir.join("secrets.toml"), secrets)
                .expect("Failed to write secrets.toml");
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            config_dir,
            database_path,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main configuration builder
#[derive(Clone)]
pub struct MainConfigBuilder {
    portal_token_url: String,
    portal_password: String,
    alert_webhook_url: Option<String>,
    schedules: Vec<(String, String)>,
    days_to_keep: u32,
    job_history_days: u32,
}

impl Default for MainConfigBuilder {
    fn default() -> Self {
        Self {
            portal_token_url: "https://portal.example.com/portal/sharing/rest/generateToken"
                .to_string(),
            portal_password: "portal-secret".to_string(),
            alert_webhook_url: None,
            schedules: Vec::new(),
            days_to_keep: 30,
            job_history_days: 90,
        }
    }
}

impl MainConfigBuilder {
    pub fn portal_token_url(mut self, url: &str) -> Self {
        self.portal_token_url = url.to_string();
        self
    }

    pub fn alert_webhook(mut self, url: &str) -> Self {
        self.alert_webhook_url = Some(url.to_string());
        self
    }

    pub fn schedule(mut self, job: &str, cron: &str) -> Self {
        self.schedules.push((job.to_string(), cron.to_string()));
        self
    }

    pub fn days_to_keep(mut self, days: u32) -> Self {
        self.days_to_keep = days;
        self
    }

    fn to_toml(&self, database_path: &str) -> String {
        let webhook = self.alert_webhook_url.as_deref().unwrap_or("");
        let schedules: String = self
            .schedules
            .iter()
            .map(|(job, cron)| format!("{} = \"{}\"\n", job, cron))
            .collect();

        format!(
            r#"
host = "127.0.0.1"
port = 8096
web_enabled = false
database_path = "{}"
alarm_webhook_url = "{}"
request_timeout_seconds = 5

[portal]
token_url = "{}"
username = "statsuser"
referer = "https://gis.example.com"

[schedules]
{}
[retention]
days_to_keep = {}
job_history_days = {}
"#,
            database_path.replace('\\', "/"),
            webhook,
            self.portal_token_url,
            schedules,
            self.days_to_keep,
            self.job_history_days
        )
    }
}

/// Server configuration builder
#[derive(Clone)]
pub struct ServerConfigBuilder {
    name: String,
    admin_url: String,
    password: String,
    short_time_period_minutes: u32,
    log_page_size: u32,
    excluded_services: Vec<String>,
    usage_stats_enabled: bool,
    service_status_enabled: bool,
    tables: Vec<(String, String)>,
}

impl ServerConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            admin_url: format!("https://{}.example.com/arcgis", name),
            password: format!("{}-secret", name),
            short_time_period_minutes: 15,
            log_page_size: 1000,
            excluded_services: Vec::new(),
            usage_stats_enabled: true,
            service_status_enabled: true,
            tables: Vec::new(),
        }
    }

    pub fn admin_url(mut self, url: &str) -> Self {
        self.admin_url = url.to_string();
        self
    }

    pub fn period_minutes(mut self, minutes: u32) -> Self {
        self.short_time_period_minutes = minutes;
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.log_page_size = size;
        self
    }

    pub fn exclude_service(mut self, suffix: &str) -> Self {
        self.excluded_services.push(suffix.to_string());
        self
    }

    pub fn usage_stats_enabled(mut self, enabled: bool) -> Self {
        self.usage_stats_enabled = enabled;
        self
    }

    pub fn service_status_enabled(mut self, enabled: bool) -> Self {
        self.service_status_enabled = enabled;
        self
    }

    pub fn table(mut self, name: &str, url: &str) -> Self {
        self.tables.push((name.to_string(), url.to_string()));
        self
    }

    fn to_toml(&self) -> String {
        let tables: String = self
            .tables
            .iter()
            .map(|(name, url)| format!("{} = \"{}\"\n", name, url))
            .collect();

        format!(
            r#"
[server]
admin_url = "{}"
username = "siteadmin"
short_time_period_minutes = {}
log_page_size = {}
excluded_services = {:?}
usage_stats_enabled = {}
service_status_enabled = {}

[tables]
{}"#,
            self.admin_url,
            self.short_time_period_minutes,
            self.log_page_size,
            self.excluded_services,
            self.usage_stats_enabled,
            self.service_status_enabled,
            tables
        )
    }
}

/// Written config directory, removed when dropped
pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub database_path: PathBuf,
}

impl TestConfig {
    pub fn config_dir_str(&self) -> String {
        self.config_dir.display().to_string()
    }

    /// Load and validate through the real config manager
    pub async fn load(&self) -> anyhow::Result<Arc<Config>> {
        let manager = ConfigManager::new(&self.config_dir_str()).await?;
        Ok(manager.get_current_config())
    }

    /// Overwrite or add a file in the config directory
    pub fn write_file(&self, name: &str, content: &str) {
        fs::write(self.config_dir.join(name), content).expect("Failed to write config file");
    }

    pub fn remove_file(&self, name: &str) {
        fs::remove_file(self.config_dir.join(name)).expect("Failed to remove config file");
    }
}
