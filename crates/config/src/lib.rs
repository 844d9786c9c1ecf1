//! kvbridge-config - 配置加载库
//!
//! 配置来源依次合并：`default.toml`、`<APP_ENV>.toml`、`KVBRIDGE_` 前缀环境变量

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "KVBRIDGE_";

/// 未启用远程缓存时使用的默认 TTL（秒）
pub const FALLBACK_TTL_SECONDS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// 适配器配置
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// 是否使用远程缓存后端
    #[serde(default)]
    pub enabled: bool,
    pub default_ttl_seconds: Option<u64>,
    pub cache_name: Option<String>,
    pub auth_token: Option<Secret<String>>,
    /// 是否启用 zstd 压缩
    #[serde(default)]
    pub compression: bool,
    pub timeout_ms: Option<u64>,
    /// 回退 Redis 地址
    #[serde(default = "default_redis_url")]
    pub redis_url: Secret<String>,
    /// 回退 Redis 集群节点，逗号分隔；设置后优先于 `redis_url`
    pub redis_cluster_nodes: Option<Secret<String>>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_redis_url() -> Secret<String> {
    Secret::new("redis://127.0.0.1:6379".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BridgeConfig {
    /// 从配置目录和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(format!("{}/default.toml", config_dir)))
                .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// 仅从环境变量加载
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_figment(Figment::new().merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// 启用远程缓存时，TTL 与缓存名必须提供
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(0) = self.default_ttl_seconds {
            return Err(ConfigError::Invalid {
                key: "KVBRIDGE_DEFAULT_TTL_SECONDS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(0) = self.timeout_ms {
            return Err(ConfigError::Invalid {
                key: "KVBRIDGE_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.enabled {
            return Ok(());
        }
        if self.default_ttl_seconds.is_none() {
            return Err(ConfigError::Missing("KVBRIDGE_DEFAULT_TTL_SECONDS"));
        }
        if self.cache_name().is_empty() {
            return Err(ConfigError::Missing("KVBRIDGE_CACHE_NAME"));
        }
        Ok(())
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds.unwrap_or(FALLBACK_TTL_SECONDS))
    }

    pub fn cache_name(&self) -> &str {
        self.cache_name.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// 集群节点地址，未配置时为空
    pub fn cluster_nodes(&self) -> Vec<String> {
        self.redis_cluster_nodes
            .as_ref()
            .map(|nodes| {
                nodes
                    .expose_secret()
                    .split(',')
                    .map(str::trim)
                    .filter(|node| !node.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_ttl_seconds: None,
            cache_name: None,
            auth_token: None,
            compression: false,
            timeout_ms: None,
            redis_url: default_redis_url(),
            redis_cluster_nodes: None,
            log_level: default_log_level(),
        }
    }
}
