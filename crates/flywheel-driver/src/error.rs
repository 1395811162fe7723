//! 驱动层错误类型定义

use flywheel_registry::RegistryError;
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// 字段取值非法
    #[error("Invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 注册表操作失败（portal 或条目注册）
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// 执行器数量超过上限
    #[error("Too many motors (max {max})")]
    TooManyMotors { max: usize },

    /// 未配置编码器
    #[error("No encoder configured")]
    MissingEncoder,

    /// 未配置控制律
    #[error("No control law configured")]
    MissingController,

    /// 配置非法
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 控制线程创建失败
    #[error("Failed to spawn control task: {0}")]
    ThreadSpawn(std::io::Error),
}
