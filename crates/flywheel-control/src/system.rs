//! 闭环数值状态

use tracing::warn;

/// 执行器安全范围 `[-ACTION_LIMIT, ACTION_LIMIT]`
pub const ACTION_LIMIT: f32 = 127.0;

/// 单个闭环的数值状态
///
/// 每次控制迭代更新一次。`error` 始终为 `measured - target`。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlSystem {
    /// 上次采样时刻（微秒）
    pub micro_time: u64,
    /// 距上次采样的时间（秒）
    pub dt: f32,
    pub target: f32,
    pub measured: f32,
    /// `measured` 的变化率
    pub derivative: f32,
    pub error: f32,
    /// 控制律输出
    pub action: f32,
}

impl ControlSystem {
    pub fn new(target: f32) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// 将 `action` 钳位到 `[-127, 127]`
    ///
    /// NaN 无法比较，直接置零。
    pub fn clamp_action(&mut self) -> f32 {
        if self.action.is_nan() {
            warn!("Control law produced NaN action, forcing 0");
            self.action = 0.0;
        }
        self.action = self.action.clamp(-ACTION_LIMIT, ACTION_LIMIT);
        self.action
    }

    /// 执行器命令（向零截断）
    pub fn command(&self) -> i8 {
        if self.action.is_nan() {
            return 0;
        }
        self.action.clamp(-ACTION_LIMIT, ACTION_LIMIT) as i8
    }

    /// 由当前 `measured` 与 `target` 重新计算误差
    pub fn refresh_error(&mut self) -> f32 {
        self.error = self.measured - self.target;
        self.error
    }

    /// 清零测量值、导数、误差与输出
    ///
    /// 目标与时间戳保留。
    pub fn clear(&mut self) {
        self.measured = 0.0;
        self.derivative = 0.0;
        self.error = 0.0;
        self.action = 0.0;
    }
}

/// 整数符号：`1` / `0` / `-1`
pub fn sign_of(x: i32) -> i32 {
    (x > 0) as i32 - (x < 0) as i32
}

/// 严格区间判断：`-size < x < size`
pub fn is_within(x: f32, size: f32) -> bool {
    -size < x && x < size
}
