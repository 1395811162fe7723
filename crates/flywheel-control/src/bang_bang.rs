//! Bang-bang 控制律
//!
//! ```text
//! error > trigger_high  →  action = action_low
//! error < trigger_low   →  action = action_high
//! 其余                  →  action 保持不变（死区）
//! ```
//!
//! # 条目
//!
//! `action-high` `action-low` `trigger-high` `trigger-low`

use crate::law::ControlLaw;
use crate::system::ControlSystem;
use flywheel_registry::{EntrySpec, PortalHandle, RegistryError, SharedValue};

/// Bang-bang 控制律
///
/// 调用之间没有状态；四个阈值可远程调整。
#[derive(Debug, Clone)]
pub struct BangBang {
    action_high: SharedValue<f32>,
    action_low: SharedValue<f32>,
    trigger_high: SharedValue<f32>,
    trigger_low: SharedValue<f32>,
}

impl BangBang {
    pub fn new(action_high: f32, action_low: f32, trigger_high: f32, trigger_low: f32) -> Self {
        Self {
            action_high: SharedValue::new(action_high),
            action_low: SharedValue::new(action_low),
            trigger_high: SharedValue::new(trigger_high),
            trigger_low: SharedValue::new(trigger_low),
        }
    }

    /// `(action_high, action_low)`
    pub fn actions(&self) -> (f32, f32) {
        (self.action_high.get(), self.action_low.get())
    }

    /// `(trigger_high, trigger_low)`
    pub fn triggers(&self) -> (f32, f32) {
        (self.trigger_high.get(), self.trigger_low.get())
    }
}

impl ControlLaw for BangBang {
    fn update(&mut self, system: &mut ControlSystem) -> f32 {
        if system.error > self.trigger_high.get() {
            system.action = self.action_low.get();
        } else if system.error < self.trigger_low.get() {
            system.action = self.action_high.get();
        }
        system.action
    }

    fn reset(&mut self) {}

    fn bind(&mut self, portal: &PortalHandle) -> Result<(), RegistryError> {
        portal.add_batch([
            EntrySpec::new("action-high").value(self.action_high.clone()),
            EntrySpec::new("action-low").value(self.action_low.clone()),
            EntrySpec::new("trigger-high").value(self.trigger_high.clone()),
            EntrySpec::new("trigger-low").value(self.trigger_low.clone()),
        ])
    }

    fn name(&self) -> &'static str {
        "bang-bang"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> BangBang {
        BangBang::new(100.0, -100.0, 10.0, -10.0)
    }

    fn run(bb: &mut BangBang, error: f32, prior: f32) -> f32 {
        let mut sys = ControlSystem {
            error,
            action: prior,
            ..Default::default()
        };
        bb.update(&mut sys)
    }

    #[test]
    fn test_above_upper_trigger_snaps_low() {
        assert_eq!(run(&mut controller(), 15.0, 0.0), -100.0);
    }

    #[test]
    fn test_below_lower_trigger_snaps_high() {
        assert_eq!(run(&mut controller(), -15.0, 0.0), 100.0);
    }

    #[test]
    fn test_deadband_holds_prior_action() {
        let mut bb = controller();
        assert_eq!(run(&mut bb, 0.0, 42.0), 42.0);
        // 触发值本身属于死区
        assert_eq!(run(&mut bb, 10.0, -7.0), -7.0);
        assert_eq!(run(&mut bb, -10.0, 3.0), 3.0);
    }

    #[test]
    fn test_accessors() {
        let bb = controller();
        assert_eq!(bb.actions(), (100.0, -100.0));
        assert_eq!(bb.triggers(), (10.0, -10.0));
    }
}
