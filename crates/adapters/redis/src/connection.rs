//! Redis 连接管理

use kvbridge_errors::{AppError, AppResult};
use redis::Client;
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use tracing::debug;

/// 创建单机连接管理器
pub async fn create_connection_manager(url: &str) -> AppResult<ConnectionManager> {
    let client = Client::open(url)
        .map_err(|e| AppError::config(format!("Invalid Redis URL: {}", e)))?;

    ConnectionManager::new(client).await.map_err(|e| {
        AppError::internal(format!("Failed to create Redis connection manager: {}", e))
    })
}

/// 创建集群连接
pub async fn create_cluster_connection(nodes: &[String]) -> AppResult<ClusterConnection> {
    if nodes.is_empty() {
        return Err(AppError::config("Redis cluster nodes cannot be empty"));
    }
    let client = ClusterClient::new(nodes.to_vec())
        .map_err(|e| AppError::config(format!("Invalid Redis cluster nodes: {}", e)))?;

    client
        .get_async_connection()
        .await
        .map_err(|e| AppError::internal(format!("Failed to connect to Redis cluster: {}", e)))
}

/// 发送 PING，单机与集群连接通用
pub async fn check_connection<C>(conn: &mut C) -> AppResult<()>
where
    C: ConnectionLike + Send,
{
    let reply: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| AppError::internal(format!("Redis PING failed: {}", e)))?;
    if reply != "PONG" {
        return Err(AppError::internal(format!("Unexpected PING reply: {}", reply)));
    }
    debug!("Redis PING ok");
    Ok(())
}
