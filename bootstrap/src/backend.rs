//! 后端选择

use std::sync::Arc;

use kvbridge_adapter_memory::MemoryCacheClient;
use kvbridge_adapter_redis::{RedisBackend, RedisClusterBackend};
use kvbridge_adapter_remote::{CacheHandle, RemoteCacheAdapter};
use kvbridge_config::BridgeConfig;
use kvbridge_errors::{AppError, AppResult};
use kvbridge_ports::{CacheClient, RedisCommands};
use secrecy::ExposeSecret;
use tracing::info;

use crate::retry::{RetryConfig, with_retry};

/// 本地模式下未配置缓存名时使用的名称
pub const LOCAL_CACHE_NAME: &str = "kvbridge-local";

/// 按配置构造远程缓存句柄
pub fn cache_handle(config: &BridgeConfig) -> CacheHandle {
    handle_for(config, config.cache_name())
}

fn handle_for(config: &BridgeConfig, cache_name: &str) -> CacheHandle {
    let mut handle = CacheHandle::new(cache_name);
    if config.compression {
        handle = handle.with_compression();
    }
    if let Some(timeout) = config.timeout() {
        handle = handle.with_timeout(timeout);
    }
    handle
}

/// 选择后端：启用时使用远程缓存客户端，否则连接 Redis（配置了集群节点时连接集群）
pub async fn connect(
    config: &BridgeConfig,
    remote: Arc<dyn CacheClient>,
) -> AppResult<Arc<dyn RedisCommands>> {
    connect_with(config, remote, &RetryConfig::default()).await
}

pub async fn connect_with(
    config: &BridgeConfig,
    remote: Arc<dyn CacheClient>,
    retry: &RetryConfig,
) -> AppResult<Arc<dyn RedisCommands>> {
    config
        .validate()
        .map_err(|e| AppError::config(e.to_string()))?;

    if config.enabled {
        info!(
            cache = config.cache_name(),
            default_ttl_secs = config.default_ttl().as_secs(),
            "Using remote cache backend"
        );
        return Ok(Arc::new(RemoteCacheAdapter::new(remote, cache_handle(config))));
    }

    let nodes = config.cluster_nodes();
    if !nodes.is_empty() {
        let mut backend = with_retry(retry, "Redis cluster connection", || {
            RedisClusterBackend::connect_cluster(&nodes)
        })
        .await?;
        if let Some(timeout) = config.timeout() {
            backend = backend.with_timeout(timeout);
        }
        return Ok(Arc::new(backend));
    }

    let url = config.redis_url.expose_secret();
    let mut backend = with_retry(retry, "Redis fallback connection", || {
        RedisBackend::connect(url)
    })
    .await?;
    if let Some(timeout) = config.timeout() {
        backend = backend.with_timeout(timeout);
    }
    Ok(Arc::new(backend))
}

/// 以进程内缓存作为远程端，用于本地开发
pub fn connect_local(config: &BridgeConfig) -> Arc<dyn RedisCommands> {
    let name = match config.cache_name() {
        "" => LOCAL_CACHE_NAME,
        name => name,
    };
    let client = MemoryCacheClient::new(config.default_ttl()).with_cache(name);
    info!(cache = name, "Using in-process cache backend");
    Arc::new(RemoteCacheAdapter::new(
        Arc::new(client),
        handle_for(config, name),
    ))
}
