use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Email for the bootstrap admin account created at first startup.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    /// Password for the bootstrap admin account. Change it in production.
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    /// Session lifetime in days.
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_admin_email() -> String {
    "admin@paisadrive.local".to_string()
}

fn default_admin_password() -> String {
    // Random per-install password when not provided in the config file
    uuid::Uuid::new_v4().to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Canonical base URL used for sitemap entries.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Fraction of the listed price counted as potential commission.
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    /// Maximum photo attachments on the sell-your-car form.
    #[serde(default = "default_max_photos")]
    pub max_photos: usize,
    /// Seed demo listings when the cars table is empty.
    #[serde(default = "default_seed_demo_cars")]
    pub seed_demo_cars: bool,
    /// Minutes an abandoned wizard session is kept before eviction.
    #[serde(default = "default_wizard_ttl_minutes")]
    pub wizard_ttl_minutes: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            commission_rate: default_commission_rate(),
            max_photos: default_max_photos(),
            seed_demo_cars: default_seed_demo_cars(),
            wizard_ttl_minutes: default_wizard_ttl_minutes(),
        }
    }
}

fn default_public_url() -> String {
    "https://www.paisadrive.com".to_string()
}

fn default_commission_rate() -> f64 {
    0.03
}

fn default_max_photos() -> usize {
    10
}

fn default_seed_demo_cars() -> bool {
    true
}

fn default_wizard_ttl_minutes() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            site: SiteConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
