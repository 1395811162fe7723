//! Take-back-half 控制律
//!
//! # 算法
//!
//! 每一步：
//!
//! 1. `action -= error * dt * gain`
//! 2. 目标变化时清除 `crossed` 锁存
//! 3. 误差符号相对上一步翻转时：
//!    - 尚未 `crossed`：由估计器按目标重新播种 `action`，置位 `crossed`
//!    - 已 `crossed`：`action = (action + last_action) / 2`
//!
//!    并记录 `last_action`
//! 4. 记录 `last_error`
//!
//! 符号按误差向零截断后的整数判断，`|error| < 1` 视为零。
//!
//! # 条目
//!
//! `gain` `last-action` `last-error` `last-target` `crossed`

use crate::law::{ControlLaw, Publisher};
use crate::system::{ControlSystem, sign_of};
use flywheel_registry::{EntrySpec, PortalHandle, RegistryError, SharedValue};
use std::fmt;

/// 由目标估计稳态输出的函数
pub type Estimator = Box<dyn Fn(f32) -> f32 + Send + Sync>;

/// 始终返回 0 的估计器
pub fn zero_estimator(_target: f32) -> f32 {
    0.0
}

/// Take-back-half 控制律
pub struct Tbh {
    gain: SharedValue<f32>,
    last_action: SharedValue<f32>,
    last_error: SharedValue<f32>,
    last_target: SharedValue<f32>,
    crossed: SharedValue<bool>,
    estimator: Estimator,
    portal: Publisher,
}

impl Tbh {
    /// # 示例
    ///
    /// ```rust
    /// use flywheel_control::{ControlLaw, ControlSystem, Tbh};
    ///
    /// let mut tbh = Tbh::new(10.0, |target| 18.195 + 2.2052e-5 * target * target);
    /// let mut sys = ControlSystem { target: 100.0, error: 20.0, dt: 0.01, ..Default::default() };
    /// let seeded = tbh.update(&mut sys);
    /// assert!((seeded - 18.41552).abs() < 1e-4);
    /// ```
    pub fn new(gain: f32, estimator: impl Fn(f32) -> f32 + Send + Sync + 'static) -> Self {
        Self {
            gain: SharedValue::new(gain),
            last_action: SharedValue::new(0.0),
            last_error: SharedValue::new(0.0),
            last_target: SharedValue::new(0.0),
            crossed: SharedValue::new(false),
            estimator: Box::new(estimator),
            portal: Publisher::default(),
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.set(gain);
    }

    pub fn crossed(&self) -> bool {
        self.crossed.get()
    }

    pub fn last_action(&self) -> f32 {
        self.last_action.get()
    }

    pub fn last_error(&self) -> f32 {
        self.last_error.get()
    }

    pub fn last_target(&self) -> f32 {
        self.last_target.get()
    }
}

impl ControlLaw for Tbh {
    fn update(&mut self, system: &mut ControlSystem) -> f32 {
        system.action -= system.error * system.dt * self.gain.get();

        if system.target != self.last_target.get() {
            self.crossed.set(false);
            self.last_target.set(system.target);
            self.portal.publish(&["crossed", "last-target"]);
        }

        if sign_of(system.error as i32) != sign_of(self.last_error.get() as i32) {
            if !self.crossed.get() {
                system.action = (self.estimator)(system.target);
                self.crossed.set(true);
                self.portal.publish(&["crossed"]);
            } else {
                system.action = 0.5 * (system.action + self.last_action.get());
            }
            self.last_action.set(system.action);
            self.portal.publish(&["last-action"]);
        }

        self.last_error.set(system.error);
        self.portal.publish(&["last-error"]);
        system.action
    }

    fn reset(&mut self) {
        self.last_action.set(0.0);
        self.last_error.set(0.0);
        self.last_target.set(0.0);
        self.crossed.set(false);
        self.portal
            .publish(&["last-action", "last-error", "last-target", "crossed"]);
    }

    fn bind(&mut self, portal: &PortalHandle) -> Result<(), RegistryError> {
        self.portal.attach(portal);
        portal.add_batch([
            EntrySpec::new("gain").value(self.gain.clone()),
            EntrySpec::new("last-action").value(self.last_action.clone()),
            EntrySpec::new("last-error").value(self.last_error.clone()),
            EntrySpec::new("last-target").value(self.last_target.clone()),
            EntrySpec::new("crossed").value(self.crossed.clone()),
        ])
    }

    fn name(&self) -> &'static str {
        "tbh"
    }
}

impl fmt::Debug for Tbh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tbh")
            .field("gain", &self.gain.get())
            .field("last_action", &self.last_action.get())
            .field("last_error", &self.last_error.get())
            .field("last_target", &self.last_target.get())
            .field("crossed", &self.crossed.get())
            .finish_non_exhaustive()
    }
}
