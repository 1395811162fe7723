//! PID 控制律
//!
//! # 算法
//!
//! ```text
//! integral += error * dt
//! action    = Kp * error + Ki * error + Kd * error
//! ```
//!
//! 三个增益都作用于当前误差，积分项只累积、不参与输出。
//! 这一行为被有意保留，并由测试固定。
//!
//! # 条目
//!
//! `gain-p` `gain-i` `gain-d` `integral`

use crate::law::{ControlLaw, Publisher};
use crate::system::ControlSystem;
use flywheel_registry::{EntrySpec, PortalHandle, RegistryError, SharedValue};

/// PID 控制律
///
/// # 示例
///
/// ```rust
/// use flywheel_control::{ControlLaw, ControlSystem, Pid};
///
/// let mut pid = Pid::new(1.0, 0.0, 0.0);
/// let mut sys = ControlSystem { error: 5.0, dt: 0.02, ..Default::default() };
/// assert_eq!(pid.update(&mut sys), 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct Pid {
    gain_p: SharedValue<f32>,
    gain_i: SharedValue<f32>,
    gain_d: SharedValue<f32>,
    integral: SharedValue<f32>,
    portal: Publisher,
}

impl Pid {
    pub fn new(gain_p: f32, gain_i: f32, gain_d: f32) -> Self {
        Self {
            gain_p: SharedValue::new(gain_p),
            gain_i: SharedValue::new(gain_i),
            gain_d: SharedValue::new(gain_d),
            integral: SharedValue::new(0.0),
            portal: Publisher::default(),
        }
    }

    /// 当前增益 `(Kp, Ki, Kd)`
    pub fn gains(&self) -> (f32, f32, f32) {
        (self.gain_p.get(), self.gain_i.get(), self.gain_d.get())
    }

    pub fn set_gains(&self, gain_p: f32, gain_i: f32, gain_d: f32) {
        self.gain_p.set(gain_p);
        self.gain_i.set(gain_i);
        self.gain_d.set(gain_d);
    }

    pub fn integral(&self) -> f32 {
        self.integral.get()
    }
}

impl ControlLaw for Pid {
    fn update(&mut self, system: &mut ControlSystem) -> f32 {
        let error = system.error;
        self.integral.update(|i| i + error * system.dt);

        let (kp, ki, kd) = self.gains();
        system.action = kp * error + ki * error + kd * error;

        self.portal.publish(&["integral"]);
        system.action
    }

    fn reset(&mut self) {
        self.integral.set(0.0);
        self.portal.publish(&["integral"]);
    }

    fn bind(&mut self, portal: &PortalHandle) -> Result<(), RegistryError> {
        self.portal.attach(portal);
        portal.add_batch([
            EntrySpec::new("gain-p").value(self.gain_p.clone()),
            EntrySpec::new("gain-i").value(self.gain_i.clone()),
            EntrySpec::new("gain-d").value(self.gain_d.clone()),
            EntrySpec::new("integral").value(self.integral.clone()),
        ])
    }

    fn name(&self) -> &'static str {
        "pid"
    }
}
