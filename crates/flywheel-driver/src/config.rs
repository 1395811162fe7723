//! 飞轮与系统配置
//!
//! ```toml
//! [registry]
//! root_id = "registry"
//! dispatch_yield_ms = 40
//!
//! [registry.wire]
//! line_size = 128
//! align_size = 8
//!
//! [flywheel]
//! id = "flywheel"
//! smoothing = 0.2
//! check_cycle = 20
//! ```
//!
//! 缺省字段取默认值。

use crate::error::ConfigError;
use flywheel_registry::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 单个飞轮的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlywheelConfig {
    /// portal id
    pub id: String,
    /// 编码器转速到飞轮转速的传动比
    pub gearing: f32,
    /// 低通滤波时间常数（秒）
    pub smoothing: f32,
    /// READY 状态的线程优先级
    pub priority_ready: u32,
    /// ACTIVE 状态的线程优先级
    pub priority_active: u32,
    /// READY 状态的帧间隔（毫秒）
    pub frame_delay_ready_ms: u64,
    /// ACTIVE 状态的帧间隔（毫秒）
    pub frame_delay_active_ms: u64,
    /// 就绪判定的误差带（严格小于）
    pub threshold_error: f32,
    /// 就绪判定的导数带（严格小于）
    pub threshold_derivative: f32,
    /// 每隔多少次迭代做一次就绪检查
    pub check_cycle: u32,
}

impl Default for FlywheelConfig {
    fn default() -> Self {
        Self {
            id: "flywheel".to_string(),
            gearing: 1.0,
            smoothing: 0.2,
            priority_ready: 2,
            priority_active: 2,
            frame_delay_ready_ms: 200,
            frame_delay_active_ms: 60,
            threshold_error: 10.0,
            threshold_derivative: 100.0,
            check_cycle: 20,
        }
    }
}

impl FlywheelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() || self.id.contains(char::is_whitespace) || self.id.contains('.') {
            return Err(invalid("id", "must be non-empty without whitespace or '.'"));
        }
        if !(self.smoothing > 0.0) {
            return Err(invalid("smoothing", "must be positive"));
        }
        if self.check_cycle == 0 {
            return Err(invalid("check_cycle", "must be at least 1"));
        }
        if !(self.threshold_error > 0.0) {
            return Err(invalid("threshold_error", "must be positive"));
        }
        if !(self.threshold_derivative > 0.0) {
            return Err(invalid("threshold_derivative", "must be positive"));
        }
        Ok(())
    }
}

/// 整个控制器的配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub registry: RegistryConfig,
    pub flywheel: FlywheelConfig,
}

impl SystemConfig {
    /// 从 TOML 文本加载并校验
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SystemConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let wire = &self.registry.wire;
        if wire.align_size == 0 {
            return Err(invalid("registry.wire.align_size", "must be at least 1"));
        }
        if wire.line_size <= wire.align_size {
            return Err(invalid(
                "registry.wire.line_size",
                "must be greater than align_size",
            ));
        }
        if self.registry.root_id.is_empty() {
            return Err(invalid("registry.root_id", "must be non-empty"));
        }
        self.flywheel.validate()
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flywheel_config() {
        let config = FlywheelConfig::default();
        assert_eq!(config.gearing, 1.0);
        assert_eq!(config.smoothing, 0.2);
        assert_eq!(config.frame_delay_ready_ms, 200);
        assert_eq!(config.frame_delay_active_ms, 60);
        assert_eq!(config.threshold_error, 10.0);
        assert_eq!(config.threshold_derivative, 100.0);
        assert_eq!(config.check_cycle, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SystemConfig::from_toml_str(
            r#"
            [registry]
            dispatch_yield_ms = 5

            [flywheel]
            id = "shooter"
            smoothing = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.registry.dispatch_yield_ms, 5);
        assert_eq!(config.registry.root_id, "registry");
        assert_eq!(config.registry.wire.line_size, 128);
        assert_eq!(config.flywheel.id, "shooter");
        assert_eq!(config.flywheel.smoothing, 0.5);
        assert_eq!(config.flywheel.check_cycle, 20);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = SystemConfig::from_toml_str("").unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn test_validation_errors() {
        let err = SystemConfig::from_toml_str("[flywheel]\nsmoothing = 0.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "smoothing",
                ..
            }
        ));

        let err = SystemConfig::from_toml_str("[flywheel]\ncheck_cycle = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "check_cycle",
                ..
            }
        ));

        let err = SystemConfig::from_toml_str("[registry.wire]\nline_size = 8\nalign_size = 8\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = SystemConfig::from_toml_str("[flywheel]\nid = \"a.b\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "id", .. }));
    }

    #[test]
    fn test_parse_error() {
        let err = SystemConfig::from_toml_str("[flywheel\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SystemConfig::load_from_file("/nonexistent/flywheel.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
