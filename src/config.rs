use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the local SQLite cache
    pub database_path: PathBuf,
    /// Actor name recorded on local edits
    pub modified_by: String,
    /// Sync settings; syncing is disabled without a server URL
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub server_url: Option<String>,
    /// Device name sent when registering
    pub client_name: Option<String>,
    /// Per-request timeout; the only bound on a sync cycle
    pub timeout_secs: u64,
    /// Run a sync automatically after local log edits
    pub auto_sync: bool,
    /// Quiet window before a watched sync fires
    pub debounce_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            database_path: PathBuf::from(&home).join(".coachtrack").join("coachtrack.db"),
            modified_by: "local".to_string(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            client_name: None,
            timeout_secs: 30,
            auto_sync: true,
            debounce_secs: 3,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        if let Ok(db_path) = std::env::var("COACHTRACK_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(modified_by) = std::env::var("COACHTRACK_MODIFIED_BY") {
            config.modified_by = modified_by;
        }
        if let Ok(url) = std::env::var("COACHTRACK_SERVER_URL") {
            config.sync.server_url = Some(url);
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/coachtrack/config.yaml
    pub fn default_config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("coachtrack")
            .join("config.yaml")
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.sync.debounce_secs)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
