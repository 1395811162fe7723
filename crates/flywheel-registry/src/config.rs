//! 注册表配置

use flywheel_protocol::WireConfig;
use serde::{Deserialize, Serialize};

/// 根 portal 的默认 id
pub const DEFAULT_ROOT_ID: &str = "registry";

/// 每条命令处理后分发线程的让出时长（毫秒）
pub const DEFAULT_DISPATCH_YIELD_MS: u64 = 40;

/// 注册表配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 根 portal id（承载 `enable` / `disable` / `keys` / `error`）
    pub root_id: String,
    /// 线路格式
    pub wire: WireConfig,
    /// 分发线程在每条命令后的让出时长
    pub dispatch_yield_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root_id: DEFAULT_ROOT_ID.to_string(),
            wire: WireConfig::default(),
            dispatch_yield_ms: DEFAULT_DISPATCH_YIELD_MS,
        }
    }
}
