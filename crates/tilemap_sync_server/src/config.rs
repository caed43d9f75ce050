use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Database file path (default: ./tilemap_sync.db)
    pub database_path: PathBuf,
    /// Tile catalog JSON (default: ./town.json)
    pub tile_config_path: PathBuf,
    /// CORS allowed origins (comma-separated)
    pub cors_origins: Vec<String>,
    /// Push committed batches over WebSocket (default: true)
    pub fanout_enabled: bool,
    /// Batches buffered per room before slow subscribers lag (default: 256)
    pub fanout_capacity: usize,
    /// How long a write waits on the SQLite lock (default: 5000ms)
    pub sqlite_busy_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = var("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_path = PathBuf::from(var("DATABASE_PATH", "./tilemap_sync.db"));
        let tile_config_path = PathBuf::from(var("TILE_CONFIG_PATH", "./town.json"));

        let cors_origins = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let fanout_enabled = var("FANOUT_ENABLED", "true").eq_ignore_ascii_case("true");
        let fanout_capacity = var("FANOUT_CAPACITY", "256").parse().unwrap_or(256);
        let sqlite_busy_timeout = Duration::from_millis(
            var("SQLITE_BUSY_TIMEOUT_MS", "5000").parse().unwrap_or(5000),
        );

        Ok(Config {
            host,
            port,
            database_path,
            tile_config_path,
            cors_origins,
            fanout_enabled,
            fanout_capacity,
            sqlite_busy_timeout,
        })
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "Invalid PORT environment variable"),
        }
    }
}

impl std::error::Error for ConfigError {}
