//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use flywheel_sdk::prelude::*;
//! ```

// 注册表
pub use flywheel_registry::{
    ChannelPeer, Clock, EntrySpec, MonotonicClock, PortalHandle, Registry, RegistryBuilder,
    SharedValue, StdioTransport, channel_transport,
};

// 控制律
pub use flywheel_control::{
    BangBang, ControlLaw, ControlSystem, Controller, Pid, Tbh, zero_estimator,
};

// 驱动层
pub use flywheel_driver::{
    Encoder, EncoderReading, Flywheel, FlywheelBuilder, FlywheelState, Motor, SystemConfig,
    Telemetry,
};

// 错误类型
pub use flywheel_driver::{ConfigError, DriverError};
pub use flywheel_protocol::ProtocolError;
pub use flywheel_registry::{RegistryError, TransportError};
