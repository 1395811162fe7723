//! # Flywheel Control
//!
//! 闭环控制律：
//!
//! - [`Pid`]: 比例-积分-微分
//! - [`Tbh`]: take-back-half（误差过零时回退一半）
//! - [`BangBang`]: 双阈值开关控制，带死区
//!
//! 三者共享 [`ControlLaw`] 接口，并可收拢为封闭的 [`Controller`] 枚举。
//! 每个飞轮在构造时选定一种控制律，运行期间不切换。

pub mod bang_bang;
mod law;
pub mod pid;
pub mod system;
pub mod tbh;

pub use bang_bang::BangBang;
pub use law::ControlLaw;
pub use pid::Pid;
pub use system::{ACTION_LIMIT, ControlSystem, is_within, sign_of};
pub use tbh::{Estimator, Tbh, zero_estimator};

use flywheel_registry::{PortalHandle, RegistryError};

/// 封闭的控制律集合
#[derive(Debug)]
pub enum Controller {
    Pid(Pid),
    Tbh(Tbh),
    BangBang(BangBang),
}

impl ControlLaw for Controller {
    fn update(&mut self, system: &mut ControlSystem) -> f32 {
        match self {
            Controller::Pid(c) => c.update(system),
            Controller::Tbh(c) => c.update(system),
            Controller::BangBang(c) => c.update(system),
        }
    }

    fn reset(&mut self) {
        match self {
            Controller::Pid(c) => c.reset(),
            Controller::Tbh(c) => c.reset(),
            Controller::BangBang(c) => c.reset(),
        }
    }

    fn bind(&mut self, portal: &PortalHandle) -> Result<(), RegistryError> {
        match self {
            Controller::Pid(c) => c.bind(portal),
            Controller::Tbh(c) => c.bind(portal),
            Controller::BangBang(c) => c.bind(portal),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Controller::Pid(c) => c.name(),
            Controller::Tbh(c) => c.name(),
            Controller::BangBang(c) => c.name(),
        }
    }
}

impl From<Pid> for Controller {
    fn from(c: Pid) -> Self {
        Controller::Pid(c)
    }
}

impl From<Tbh> for Controller {
    fn from(c: Tbh) -> Self {
        Controller::Tbh(c)
    }
}

impl From<BangBang> for Controller {
    fn from(c: BangBang) -> Self {
        Controller::BangBang(c)
    }
}
