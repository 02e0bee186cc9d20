use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (tickets and settings lost on restart)
    #[serde(rename = "none")]
    None,

    /// SQLite database
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./monitor.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub devices: Option<Vec<DeviceConfig>>,

    /// Storage configuration (defaults to SQLite at ./monitor.db)
    pub storage: Option<StorageConfig>,

    /// HTTP API (disabled when absent)
    pub api: Option<ApiSection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DeviceConfig {
    /// Stable identifier, used in API paths and events
    pub id: String,
    pub display: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default = "default_username")]
    pub username: String,
    pub password: Option<String>,
    /// Name of an environment variable holding the password
    pub password_env: Option<String>,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Accept self-signed router certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Start monitoring as soon as the hub is up
    #[serde(default)]
    pub auto_start: bool,
    /// Poll interval in seconds used by auto start
    pub interval: Option<u64>,
}

impl DeviceConfig {
    pub fn display_name(&self) -> String {
        self.display.clone().unwrap_or_else(|| self.id.clone())
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.scheme {
            Scheme::Http => 80,
            Scheme::Https => 443,
        })
    }

    /// Root of the RouterOS REST API, without trailing slash
    pub fn base_url(&self) -> String {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        format!("{scheme}://{}:{}/rest", self.host, self.effective_port())
    }

    /// Password from `password_env` when set and present, else `password`
    pub fn resolve_password(&self) -> Option<String> {
        self.password_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .or_else(|| self.password.clone())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSection {
    #[serde(default = "crate::util::get_bind_addr")]
    pub bind: SocketAddr,
    /// Bearer token; falls back to the environment when absent
    pub token: Option<String>,
    #[serde(default = "default_cors")]
    pub cors: bool,
}

fn default_username() -> String {
    String::from("admin")
}

fn default_timeout() -> u64 {
    10
}

fn default_cors() -> bool {
    true
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}
