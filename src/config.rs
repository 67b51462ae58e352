use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Listening port (default: 8888)
    #[serde(default = "default_port")]
    pub port: u16,
    /// What `/predict` does when the activity insert fails
    #[serde(default)]
    pub persist_policy: PersistPolicy,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            persist_policy: PersistPolicy::default(),
        }
    }
}

/// Handling of activity-store failures after a prediction has been computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Fail the request with a storage error.
    #[default]
    Strict,
    /// Log the failure and still return the prediction.
    BestEffort,
}

impl PersistPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::BestEffort => "best_effort",
        }
    }
}

impl FromStr for PersistPolicy {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "best_effort" | "best-effort" => Ok(Self::BestEffort),
            other => Err(format!(
                "invalid persist policy '{other}'; expected strict|best_effort"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Classifier artifact (`.json` dense network, or `.onnx` with the `onnx` feature)
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/activity_model.json")
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Apply embedded migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_run_migrations() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            max_connections: default_max_connections(),
            run_migrations: default_run_migrations(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rotating log files
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a config directory, then the environment
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("store.max_connections", 5)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("ACTIVITY_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (ACTIVITY_SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("ACTIVITY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be > 0".to_string());
        }

        if self.server.host.trim().is_empty() {
            errors.push("server.host must not be empty".to_string());
        }

        if self.model.path.as_os_str().is_empty() {
            errors.push("model.path must not be empty".to_string());
        }

        if self.store.backend == StoreBackend::Postgres {
            let missing_url = self
                .store
                .url
                .as_deref()
                .map(str::trim)
                .map_or(true, str::is_empty);
            if missing_url {
                errors.push("store.url is required for the postgres backend".to_string());
            }
            if self.store.max_connections == 0 {
                errors.push("store.max_connections must be > 0".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `host:port` string for binding the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that read or write ACTIVITY_* variables hold this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn empty_config_dir() -> PathBuf {
        std::env::temp_dir().join(format!("activity-cfg-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn defaults_listen_on_8888() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8888);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8888");
        assert_eq!(cfg.server.persist_policy, PersistPolicy::Strict);
    }

    #[test]
    fn postgres_backend_requires_url() {
        let cfg = AppConfig::default();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("store.url")));

        let mut cfg = AppConfig::default();
        cfg.store.backend = StoreBackend::Memory;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_collects_all_errors() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        cfg.model.path = PathBuf::new();
        cfg.store.url = Some("postgres://localhost/activity".to_string());
        cfg.store.max_connections = 0;

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn persist_policy_parses() {
        assert_eq!("strict".parse::<PersistPolicy>(), Ok(PersistPolicy::Strict));
        assert_eq!(
            "Best-Effort".parse::<PersistPolicy>(),
            Ok(PersistPolicy::BestEffort)
        );
        assert!("sometimes".parse::<PersistPolicy>().is_err());
    }

    #[test]
    fn load_from_missing_dir_uses_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let cfg = AppConfig::load_from(empty_config_dir()).unwrap();
        assert_eq!(cfg.server.port, 8888);
        assert_eq!(cfg.model.path, PathBuf::from("models/activity_model.json"));
    }

    #[test]
    fn env_overrides_use_single_underscore_prefix() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("ACTIVITY_SERVER__PORT", "9001");
        std::env::set_var("ACTIVITY_SERVER__PERSIST_POLICY", "best_effort");
        std::env::set_var("ACTIVITY_STORE__BACKEND", "memory");
        let loaded = AppConfig::load_from(empty_config_dir());
        std::env::remove_var("ACTIVITY_SERVER__PORT");
        std::env::remove_var("ACTIVITY_SERVER__PERSIST_POLICY");
        std::env::remove_var("ACTIVITY_STORE__BACKEND");

        let cfg = loaded.unwrap();
        assert_eq!(cfg.server.port, 9001);
        assert_eq!(cfg.server.persist_policy, PersistPolicy::BestEffort);
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9001");
    }
}
