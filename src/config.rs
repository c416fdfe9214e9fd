use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub matcher: MatcherConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 上传文件大小上限 (字节)
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// 获取连接的超时时间 (秒)
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// 单批次内并发处理的记录数
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/faktur";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_upload_bytes: 10 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: 20,
                acquire_timeout_secs: 10,
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
            },
            matcher: MatcherConfig { concurrency: 1 },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载顺序: 内置默认值 → config/default.toml (可选) → FAKTUR__SECTION__KEY 环境变量;
    /// DATABASE_URL 覆盖 database.url
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("FAKTUR")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.max_upload_bytes", defaults.server.max_upload_bytes as u64)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("database.acquire_timeout_secs", defaults.database.acquire_timeout_secs)?
            .set_default("storage.backend", "postgres")?
            .set_default("matcher.concurrency", defaults.matcher.concurrency as u64)?
            .set_default("logging.level", defaults.logging.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize() {
        let config: AppConfig = AppConfig::builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.matcher.concurrency, 1);
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.database.acquire_timeout_secs, 10);
    }

    #[test]
    fn test_shipped_toml_matches_defaults() {
        let config: AppConfig = AppConfig::builder()
            .unwrap()
            .add_source(File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let defaults = AppConfig::default();

        assert_eq!(config.matcher.concurrency, defaults.matcher.concurrency);
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.server.max_upload_bytes, defaults.server.max_upload_bytes);
        assert_eq!(config.database.url, defaults.database.url);
        assert_eq!(config.database.max_connections, defaults.database.max_connections);
        assert_eq!(
            config.database.acquire_timeout_secs,
            defaults.database.acquire_timeout_secs
        );
        assert_eq!(config.storage.backend, defaults.storage.backend);
        assert_eq!(config.logging.level, defaults.logging.level);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config: AppConfig = AppConfig::builder()
            .unwrap()
            .add_source(File::from_str(
                "[storage]\nbackend = \"memory\"\n[matcher]\nconcurrency = 8\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.matcher.concurrency, 8);
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
