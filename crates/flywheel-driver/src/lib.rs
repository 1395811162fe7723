//! # Flywheel Driver
//!
//! 飞轮周期控制任务。
//!
//! ## 主要特性
//!
//! - **一阶低通滤波**: 测量值与导数按 `smoothing` 时间常数平滑
//! - **控制律**: PID / TBH / Bang-Bang，经 [`ControlLaw`](flywheel_control::ControlLaw) 接入
//! - **执行器扇出**: 同一命令写入最多 [`MAX_MOTORS`] 个执行器
//! - **就绪状态机**: 误差与导数同时落入阈值带时进入 READY，并唤醒全部等待者
//! - **无锁遥测**: 每次迭代后发布 `ArcSwap` 快照，注册表读取不与控制任务争锁
//!
//! ## 模块
//!
//! - `builder`: Builder 模式
//! - `flywheel`: 飞轮对象与注册表条目
//! - `task`: 周期控制任务
//! - `state`: 状态机与就绪信号
//! - `filter`: 低通滤波
//! - `hardware`: 编码器 / 执行器接口
//! - `config`: TOML 配置

mod builder;
pub mod config;
mod error;
pub mod filter;
mod flywheel;
pub mod hardware;
pub mod state;
mod task;

pub use builder::FlywheelBuilder;
pub use config::{FlywheelConfig, SystemConfig};
pub use error::{ConfigError, DriverError};
pub use filter::filter_step;
pub use flywheel::{Callback, Flywheel, Telemetry};
pub use hardware::{Encoder, EncoderReading, MAX_MOTORS, Motor, MotorBank};
pub use state::{FlywheelState, ReadySignal};
