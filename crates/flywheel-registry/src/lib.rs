//! # Flywheel Registry
//!
//! 树状索引的远程自省注册表：
//!
//! - **Portal**: 条目的命名空间，可使能/禁用，schema 就绪后冻结
//! - **Entry**: 可独立寻址的过程变量或命令
//! - **流式输出**: `flush` 将 portal 内所有流式条目拼成一行遥测
//! - **命令分发**: 全局就绪后启动的后台线程，逐行读取并执行入站命令
//!
//! 所有寻址/状态/解析错误都是非致命的：记录警告，写入根 portal 的 `error` 条目，
//! 触发操作变为空操作。
//!
//! # 使用示例
//!
//! ```rust
//! use flywheel_registry::{EntrySpec, RegistryBuilder, SharedValue};
//! use flywheel_registry::transport::channel_transport;
//!
//! let (transport, peer) = channel_transport();
//! let registry = RegistryBuilder::new().transport(transport).build();
//!
//! let target = SharedValue::new(0.0f32);
//! let portal = registry.create("flywheel").unwrap();
//! portal.add(EntrySpec::new("target").value(target.clone()).onchange()).unwrap();
//! portal.enable().unwrap();
//!
//! registry.dispatch_line("flywheel.target 2400");
//! assert_eq!(target.get(), 2400.0);
//! assert!(peer.try_recv_line().unwrap().ends_with("2400.000000"));
//! ```

pub mod config;
mod dispatch;
pub mod entry;
mod error;
pub mod handler;
pub mod portal;
mod registry;
pub mod transport;

pub use config::RegistryConfig;
pub use entry::EntrySpec;
pub use error::{RegistryError, TransportError};
pub use handler::{
    EntryHandler, SharedValue, accessor_handler, read_only_handler, value_handler,
};
pub use portal::{PortalHandle, PortalId};
pub use registry::{ERROR_KEY, Registry, RegistryBuilder};
pub use transport::{
    ChannelPeer, ChannelTransport, Clock, LineSink, LineSource, MonotonicClock, StdioTransport,
    channel_transport,
};
