//! 运行时初始化

use kvbridge_config::BridgeConfig;
use kvbridge_errors::{AppError, AppResult};
use kvbridge_telemetry::{
    PrometheusHandle, describe_metrics, init_metrics, init_tracing, init_tracing_json,
};
use tracing::info;

/// 运行时配置
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config_dir: String,
    /// 输出 JSON 格式日志
    pub json_logs: bool,
    /// 安装 Prometheus 指标记录器
    pub prometheus: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_dir: "config".to_string(),
            json_logs: false,
            prometheus: false,
        }
    }
}

/// 读取 `.env` 后加载配置
pub fn load_config(runtime: &RuntimeConfig) -> AppResult<BridgeConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        info!(path = %path.display(), "Loaded .env file");
    }
    BridgeConfig::load(&runtime.config_dir).map_err(|e| AppError::config(e.to_string()))
}

/// 初始化日志与指标，启用 Prometheus 时返回其渲染句柄
pub fn init_runtime(
    runtime: &RuntimeConfig,
    config: &BridgeConfig,
) -> AppResult<Option<PrometheusHandle>> {
    let result = if runtime.json_logs {
        init_tracing_json(&config.log_level)
    } else {
        init_tracing(&config.log_level)
    };
    result.map_err(|e| AppError::internal(e.to_string()))?;

    let handle = if runtime.prometheus {
        Some(init_metrics().map_err(|e| AppError::internal(e.to_string()))?)
    } else {
        describe_metrics();
        None
    };

    info!(
        enabled = config.enabled,
        cache = config.cache_name(),
        compression = config.compression,
        prometheus = runtime.prometheus,
        "Runtime initialized"
    );
    Ok(handle)
}
