//! Portal：条目的命名空间
//!
//! 每个 portal 维护两套相互独立的顺序：
//!
//! - 按 key 的字典序索引（`BTreeMap`），用于寻址
//! - 插入顺序（`entries`），用于使能/禁用时的遍历
//!
//! 另有流式子集 `stream_order`，新注册的流式条目排在最前。

use crate::entry::{Entry, EntrySpec};
use crate::error::RegistryError;
use crate::handler::EntryHandler;
use crate::registry::Registry;
use flywheel_protocol::STREAM_SEPARATOR;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Portal 在注册表中的句柄索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalId(pub(crate) usize);

pub(crate) struct Portal {
    pub id: String,
    pub enabled: bool,
    /// schema 已冻结
    pub ready: bool,
    pub stream: bool,
    pub onchange: bool,
    pub entries: Vec<Entry>,
    index: BTreeMap<String, usize>,
    stream_order: Vec<usize>,
}

impl Portal {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            enabled: false,
            ready: false,
            stream: true,
            onchange: true,
            entries: Vec::new(),
            index: BTreeMap::new(),
            stream_order: Vec::new(),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn entry(&self, key: &str) -> Result<&Entry, RegistryError> {
        match self.lookup(key) {
            Some(idx) => Ok(&self.entries[idx]),
            None => Err(self.unknown_entry(key)),
        }
    }

    pub fn entry_mut(&mut self, key: &str) -> Result<&mut Entry, RegistryError> {
        match self.lookup(key) {
            Some(idx) => Ok(&mut self.entries[idx]),
            None => Err(self.unknown_entry(key)),
        }
    }

    fn unknown_entry(&self, key: &str) -> RegistryError {
        RegistryError::UnknownEntry {
            portal: self.id.clone(),
            key: key.to_string(),
        }
    }

    pub fn insert(&mut self, spec: EntrySpec) -> Result<(), RegistryError> {
        if self.ready {
            return Err(RegistryError::SchemaFrozen {
                portal: self.id.clone(),
                key: spec.key,
            });
        }
        if self.index.contains_key(&spec.key) {
            return Err(RegistryError::DuplicateEntry {
                portal: self.id.clone(),
                key: spec.key,
            });
        }

        let idx = self.entries.len();
        let entry = Entry::from_spec(spec, self.enabled);
        self.index.insert(entry.key.clone(), idx);
        if entry.stream {
            self.stream_order.insert(0, idx);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// 分配（并清空）全部条目缓冲区
    pub fn enable(&mut self) {
        self.enabled = true;
        for entry in &mut self.entries {
            entry.buffer = Some(String::new());
        }
    }

    /// 释放全部条目缓冲区
    pub fn disable(&mut self) {
        self.enabled = false;
        for entry in &mut self.entries {
            entry.buffer = None;
        }
    }

    pub fn stream_keys(&self) -> String {
        self.stream_order
            .iter()
            .map(|&idx| self.entries[idx].key.as_str())
            .collect::<Vec<_>>()
            .join(STREAM_SEPARATOR)
    }

    /// 以空格分隔的 key 序列整体替换流式子集
    ///
    /// 任一 key 不存在时返回错误，原子集保持不变。
    pub fn set_stream_keys(&mut self, sequence: &str) -> Result<(), RegistryError> {
        let order = sequence
            .split_whitespace()
            .map(|key| self.lookup(key).ok_or_else(|| self.unknown_entry(key)))
            .collect::<Result<Vec<_>, _>>()?;

        for entry in &mut self.entries {
            entry.stream = false;
        }
        for &idx in &order {
            self.entries[idx].stream = true;
        }
        self.stream_order = order;
        Ok(())
    }

    /// 拼接流式条目的当前文本
    ///
    /// 没有流式条目时返回 `Ok(None)`。
    pub fn stream_text(&self) -> Result<Option<String>, RegistryError> {
        if self.stream_order.is_empty() {
            return Ok(None);
        }
        let mut parts = Vec::with_capacity(self.stream_order.len());
        for &idx in &self.stream_order {
            let entry = &self.entries[idx];
            match &entry.buffer {
                Some(text) => parts.push(text.as_str()),
                None => {
                    return Err(RegistryError::BufferMissing {
                        portal: self.id.clone(),
                        key: entry.key.clone(),
                    });
                },
            }
        }
        Ok(Some(parts.join(STREAM_SEPARATOR)))
    }
}

/// 绑定到单个 portal 的便捷句柄
///
/// 持有注册表的 `Arc`，可在线程间克隆传递。
///
/// # 示例
///
/// ```rust
/// use flywheel_registry::{EntrySpec, RegistryBuilder, SharedValue};
/// use flywheel_registry::transport::channel_transport;
///
/// let (transport, _peer) = channel_transport();
/// let registry = RegistryBuilder::new().transport(transport).build();
///
/// let portal = registry.create("intake").unwrap();
/// portal.add(EntrySpec::new("speed").value(SharedValue::new(0i32)).stream()).unwrap();
/// portal.enable().unwrap();
/// portal.update("speed").unwrap();
/// assert_eq!(portal.text("speed").unwrap().as_deref(), Some("0"));
/// ```
#[derive(Clone)]
pub struct PortalHandle {
    registry: Arc<Registry>,
    id: PortalId,
}

impl PortalHandle {
    pub(crate) fn new(registry: Arc<Registry>, id: PortalId) -> Self {
        Self { registry, id }
    }

    pub fn id(&self) -> PortalId {
        self.id
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn name(&self) -> String {
        self.registry.portal_name(self.id).unwrap_or_default()
    }

    pub fn add(&self, spec: EntrySpec) -> Result<(), RegistryError> {
        self.registry.add_entry(self.id, spec)
    }

    pub fn add_batch(
        &self,
        specs: impl IntoIterator<Item = EntrySpec>,
    ) -> Result<(), RegistryError> {
        self.registry.add_batch(self.id, specs)
    }

    pub fn set(&self, key: &str, text: &str) -> Result<(), RegistryError> {
        self.registry.set_entry(self.id, key, text)
    }

    pub fn update(&self, key: &str) -> Result<(), RegistryError> {
        self.registry.update_entry(self.id, key)
    }

    pub fn flush(&self) -> Result<(), RegistryError> {
        self.registry.flush(self.id)
    }

    pub fn enable(&self) -> Result<(), RegistryError> {
        self.registry.enable(self.id)
    }

    pub fn disable(&self) -> Result<(), RegistryError> {
        self.registry.disable(self.id)
    }

    pub fn mark_ready(&self) -> Result<(), RegistryError> {
        self.registry.mark_ready(self.id)
    }

    pub fn is_enabled(&self) -> bool {
        self.registry.is_enabled(self.id)
    }

    pub fn stream_keys(&self) -> Result<String, RegistryError> {
        self.registry.stream_keys(self.id)
    }

    pub fn set_stream_keys(&self, sequence: &str) -> Result<(), RegistryError> {
        self.registry.set_stream_keys(self.id, sequence)
    }

    /// 条目当前缓冲区（portal 禁用时为 `None`）
    pub fn text(&self, key: &str) -> Result<Option<String>, RegistryError> {
        self.registry.entry_text(self.id, key)
    }

    /// 读写本 portal 流式子集的处理器（供 `keys` 条目使用）
    pub fn stream_keys_handler(&self) -> Arc<dyn EntryHandler> {
        self.registry.stream_keys_handler(self.id)
    }

    pub fn set_streaming(&self, stream: bool) -> Result<(), RegistryError> {
        self.registry.configure(self.id, Some(stream), None)
    }

    pub fn set_onchange(&self, onchange: bool) -> Result<(), RegistryError> {
        self.registry.configure(self.id, None, Some(onchange))
    }
}

impl std::fmt::Debug for PortalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalHandle")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}
