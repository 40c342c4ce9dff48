//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `hub.toml`.
//!     loads configuration from file or falls back to defaults,
//!     then applies environment overrides (PORT, DATA_FILE).
//!
//! structure:
//!     - ServerConfig: Where the api/dashboard listens.
//!     - StorageConfig: Snapshot file and retention bound.
//!     - ApiConfig: Default page size for list queries.
//!     - LoggingConfig: Log level and per-reading logging.
//!     - ClusterConfig: Role ("hub" or "node") and where nodes push to.
//!     - PollingConfig: How often a node pushes a reading.
//!
//! ==============================================================================

use crate::store::{DEFAULT_LIMIT, MAX_RETAINED};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_file: PathBuf,
    pub max_retained: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub default_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Hub,
    Node,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClusterConfig {
    pub role: Role,
    pub node_id: String,
    pub hub_url: String,   // URL to push data to (if node)
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0".to_string(), port: 3000 }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_file: PathBuf::from("sensor_data.json"), max_retained: MAX_RETAINED }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { default_limit: DEFAULT_LIMIT }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            role: Role::Hub,
            node_id: "node-1".to_string(),
            hub_url: "http://127.0.0.1:3000".to_string(),
            location: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 5 }
    }
}

impl HubConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback, then apply environment overrides
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("hub.toml"),
            PathBuf::from("..").join("config").join("hub.toml"),
        ];

        let mut config = None;
        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(c) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        config = Some(c);
                        break;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            println!("[CONFIG] Warning: No config file found - using defaults");
            Self::default()
        });
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// PORT and DATA_FILE win over the file
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => println!("[CONFIG] Warning: ignoring non-numeric PORT={:?}", port),
            }
        }
        if let Some(file) = var("DATA_FILE").filter(|f| !f.trim().is_empty()) {
            self.storage.data_file = PathBuf::from(file);
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│            HUB CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Role: {:?}", self.cluster.role);
        match self.cluster.role {
            Role::Hub => {
                println!("│ Listen: {}", self.listen_addr());
                println!("│ Data File: {}", self.storage.data_file.display());
                println!("│ Max Retained: {}", self.storage.max_retained);
            }
            Role::Node => {
                println!("│ Node ID: {}", self.cluster.node_id);
                println!("│ Hub URL: {}", self.cluster.hub_url);
                println!("│ Push Interval: {}s", self.polling.interval_seconds);
            }
        }
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
