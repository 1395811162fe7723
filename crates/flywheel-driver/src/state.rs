//! 飞轮状态机与就绪信号
//!
//! ```text
//!            set_target / 检查失败
//!   READY ─────────────────────────▶ ACTIVE
//!     ▲                                │
//!     └──────── 检查通过 ◀─────────────┘
//! ```
//!
//! 就绪信号是电平触发的：每次进入 READY 都会唤醒全部等待者，
//! 等待者可带超时。任何状态变化也会唤醒控制任务的帧间等待。

use flywheel_protocol::WireValue;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// 飞轮运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlywheelState {
    /// 转速已稳定在误差带内（初始状态）
    #[default]
    Ready,
    /// 正在追踪目标
    Active,
}

impl FlywheelState {
    pub fn is_ready(self) -> bool {
        self == FlywheelState::Ready
    }

    /// `ready` 条目的线路文本
    pub fn render(self) -> String {
        self.is_ready().render()
    }
}

/// 状态与就绪通知
#[derive(Debug, Default)]
pub struct ReadySignal {
    state: Mutex<FlywheelState>,
    cond: Condvar,
}

impl ReadySignal {
    pub fn new(state: FlywheelState) -> Self {
        Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
        }
    }

    pub fn get(&self) -> FlywheelState {
        *self.state.lock()
    }

    /// 切换状态，返回旧状态
    ///
    /// 唤醒全部等待者（就绪等待者与控制任务的帧间等待）。
    pub fn set(&self, state: FlywheelState) -> FlywheelState {
        let mut guard = self.state.lock();
        let previous = std::mem::replace(&mut *guard, state);
        if previous != state || state.is_ready() {
            self.cond.notify_all();
        }
        previous
    }

    /// 等待进入 READY
    ///
    /// `timeout` 为 `None` 或大到无法表示截止时刻（如 `Duration::MAX`）时无限等待。
    /// 返回等待结束时是否处于 READY。
    pub fn wait_ready(&self, timeout: Option<Duration>) -> bool {
        self.wait_while(timeout, |state| !state.is_ready());
        self.get().is_ready()
    }

    /// 等待状态离开 `from`，最多等待 `timeout`
    ///
    /// 返回状态是否已变化。
    pub fn wait_change(&self, from: FlywheelState, timeout: Duration) -> bool {
        self.wait_while(Some(timeout), |state| state == from);
        self.get() != from
    }

    fn wait_while(&self, timeout: Option<Duration>, blocked: impl Fn(FlywheelState) -> bool) {
        let mut guard = self.state.lock();
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        match deadline {
            None => {
                while blocked(*guard) {
                    self.cond.wait(&mut guard);
                }
            },
            Some(deadline) => {
                while blocked(*guard) {
                    if self.cond.wait_until(&mut guard, deadline).timed_out() {
                        break;
                    }
                }
            },
        }
    }
}
