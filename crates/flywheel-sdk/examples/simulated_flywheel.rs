//! 模拟飞轮
//!
//! 一阶惯性模型代替真实电机与编码器，控制律为 TBH。
//! 遥测输出到标准输出，命令从标准输入读取，例如：
//!
//! ```text
//! registry.enable flywheel
//! flywheel.target 2400
//! flywheel.gain 0.02
//! ```
//!
//! 用法：`cargo run --example simulated_flywheel [config.toml]`

use flywheel_sdk::prelude::*;
use std::time::Duration;
use tracing::info;

/// 满输出时的稳态转速
const RPM_PER_COMMAND: f32 = 25.0;
/// 每次迭代向稳态逼近的比例
const PLANT_RESPONSE: f32 = 0.1;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    flywheel_sdk::init_logger();

    let config = match std::env::args().nth(1) {
        Some(path) => SystemConfig::load_from_file(path)?,
        None => SystemConfig::default(),
    };

    let registry = RegistryBuilder::new()
        .transport(StdioTransport)
        .config(config.registry.clone())
        .build();

    let plant_rpm = SharedValue::new(0.0f32);
    let encoder_rpm = plant_rpm.clone();

    let flywheel = FlywheelBuilder::new()
        .config(config.flywheel.clone())
        .encoder(move || EncoderReading {
            revolutions: 0.0,
            rpm: encoder_rpm.get(),
        })
        .motor(move |command: i8| {
            plant_rpm.update(|rpm| rpm + (command as f32 * RPM_PER_COMMAND - rpm) * PLANT_RESPONSE);
        })
        .controller(Tbh::new(0.02, |target: f32| {
            (target / RPM_PER_COMMAND).clamp(-127.0, 127.0)
        }))
        .on_ready(|| info!("flywheel at speed"))
        .on_active(|| info!("flywheel spinning up"))
        .build(&registry)?;

    registry.ready();
    flywheel.run()?;

    loop {
        std::thread::sleep(Duration::from_secs(1));
        let telemetry = flywheel.telemetry();
        info!(
            "state={:?} target={:.0} measured={:.1} action={:.1}",
            flywheel.state(),
            telemetry.system.target,
            telemetry.system.measured,
            telemetry.system.action
        );
    }
}
