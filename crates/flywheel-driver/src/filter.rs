//! 测量值与导数的一阶低通滤波
//!
//! ```text
//! Δm = (rpm - measured) * dt / smoothing
//! d  = Δm / dt
//! Δd = (d - derivative) * dt / smoothing
//! measured   += Δm
//! derivative += Δd
//! ```
//!
//! `dt` 与 `smoothing` 由调用方保证为正。

use flywheel_control::ControlSystem;

/// 以新采样推进一步滤波，并刷新误差
pub fn filter_step(system: &mut ControlSystem, rpm: f32, dt: f32, smoothing: f32) {
    let measure_change = (rpm - system.measured) * (dt / smoothing);
    let derivative = measure_change / dt;
    let derivative_change = (derivative - system.derivative) * (dt / smoothing);

    system.measured += measure_change;
    system.derivative += derivative_change;
    system.refresh_error();
}
