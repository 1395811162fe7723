//! 条目定义
//!
//! [`EntrySpec`] 是注册条目时使用的构建器；[`Entry`] 是注册表内部的存储形式。

use crate::handler::{EntryHandler, SharedValue, value_handler};
use flywheel_protocol::WireValue;
use std::sync::Arc;

/// 条目描述（构建器）
///
/// # 示例
///
/// ```rust
/// use flywheel_registry::{EntrySpec, SharedValue};
///
/// let gain = SharedValue::new(0.5f32);
/// let spec = EntrySpec::new("gain").value(gain).stream();
/// assert_eq!(spec.key(), "gain");
/// ```
#[derive(Clone)]
pub struct EntrySpec {
    pub(crate) key: String,
    pub(crate) handler: Option<Arc<dyn EntryHandler>>,
    pub(crate) stream: bool,
    pub(crate) onchange: bool,
    pub(crate) manual: bool,
}

impl EntrySpec {
    /// 创建没有处理器、不带任何标志的条目
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            handler: None,
            stream: false,
            onchange: false,
            manual: false,
        }
    }

    /// 绑定处理器
    pub fn handler(mut self, handler: Arc<dyn EntryHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// 绑定共享值（内置读写处理器）
    pub fn value<T: WireValue>(self, cell: SharedValue<T>) -> Self {
        self.handler(value_handler(cell))
    }

    /// 纳入周期性遥测行
    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }

    /// 值变化时立即广播
    pub fn onchange(mut self) -> Self {
        self.onchange = true;
        self
    }

    /// 命令处理后不自动刷新规范值
    pub fn manual(mut self) -> Self {
        self.manual = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for EntrySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntrySpec")
            .field("key", &self.key)
            .field("has_handler", &self.handler.is_some())
            .field("stream", &self.stream)
            .field("onchange", &self.onchange)
            .field("manual", &self.manual)
            .finish()
    }
}

/// 已注册的条目
pub(crate) struct Entry {
    pub key: String,
    /// 仅在 portal 使能期间为 `Some`
    pub buffer: Option<String>,
    pub handler: Option<Arc<dyn EntryHandler>>,
    pub stream: bool,
    pub onchange: bool,
    pub manual: bool,
}

impl Entry {
    pub fn from_spec(spec: EntrySpec, enabled: bool) -> Self {
        Self {
            key: spec.key,
            buffer: enabled.then(String::new),
            handler: spec.handler,
            stream: spec.stream,
            onchange: spec.onchange,
            manual: spec.manual,
        }
    }
}
