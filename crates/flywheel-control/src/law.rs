//! 控制律通用接口
//!
//! # 生命周期
//!
//! - **构造**: 设置参数（增益、阈值、估计器）
//! - **绑定**: `bind()` 将参数与内部状态注册为 portal 条目（在 portal 就绪之前）
//! - **运行**: 控制任务每次迭代调用 `update()`
//! - **复位**: `reset()` 清除内部状态，参数保留
//!
//! 参数与状态以 [`SharedValue`](flywheel_registry::SharedValue) 持有，
//! 远程写入立即对下一次 `update()` 生效。

use crate::system::ControlSystem;
use flywheel_registry::{PortalHandle, RegistryError};

/// 控制律
///
/// 控制律由控制任务独占，调用发生在飞轮锁内。
pub trait ControlLaw: Send {
    /// 计算一步输出
    ///
    /// 结果写入 `system.action` 并返回。钳位由调用方负责。
    fn update(&mut self, system: &mut ControlSystem) -> f32;

    /// 清除内部状态
    fn reset(&mut self);

    /// 将参数与状态注册到 portal
    fn bind(&mut self, portal: &PortalHandle) -> Result<(), RegistryError>;

    /// 控制律名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 绑定后的 portal，未绑定时发布为空操作
#[derive(Debug, Clone, Default)]
pub(crate) struct Publisher(Option<PortalHandle>);

impl Publisher {
    pub fn attach(&mut self, portal: &PortalHandle) {
        self.0 = Some(portal.clone());
    }

    pub fn publish(&self, keys: &[&str]) {
        if let Some(portal) = &self.0 {
            for key in keys {
                // 错误已由注册表上报
                let _ = portal.update(key);
            }
        }
    }
}
