//! Flywheel SDK - 飞轮闭环转速控制
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **协议层** (`protocol`): 行协议的格式化与命令解析
//! - **注册表** (`registry`): portal / 条目注册、遥测流与远程读写
//! - **控制层** (`control`): PID、TBH、Bang-Bang 控制律
//! - **驱动层** (`driver`): 滤波、执行器扇出、就绪状态机与周期任务
//!
//! # 快速开始
//!
//! ```rust
//! use flywheel_sdk::prelude::*;
//!
//! let (transport, _peer) = channel_transport();
//! let registry = RegistryBuilder::new().transport(transport).build();
//!
//! let flywheel = FlywheelBuilder::new()
//!     .id("shooter")
//!     .encoder(|| EncoderReading::default())
//!     .motor(|_command: i8| {})
//!     .controller(Tbh::new(0.05, zero_estimator))
//!     .build(&registry)
//!     .unwrap();
//! registry.ready();
//!
//! flywheel.set_target(2400.0);
//! assert!(!flywheel.is_ready());
//! ```

pub mod logging;
pub mod prelude;

pub use flywheel_control as control;
pub use flywheel_driver as driver;
pub use flywheel_protocol as protocol;
pub use flywheel_registry as registry;

pub use flywheel_control::{BangBang, ControlLaw, ControlSystem, Controller, Pid, Tbh};
pub use flywheel_driver::{
    DriverError, Flywheel, FlywheelBuilder, FlywheelConfig, FlywheelState, SystemConfig,
};
pub use flywheel_protocol::ProtocolError;
pub use flywheel_registry::{PortalHandle, Registry, RegistryBuilder, RegistryError};
pub use logging::init_logger;
