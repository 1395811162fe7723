//! 注册表根对象
//!
//! 持有全部 portal、传输能力与时钟，并在全局就绪时惰性启动分发线程。
//!
//! # 锁纪律
//!
//! - 内部状态由单个 `parking_lot::Mutex` 保护
//! - 处理器调用与出站写行都在锁外进行，处理器可以安全地回调注册表
//! - 错误上报（写入根 portal 的 `error` 条目）同样在锁外进行
//!
//! # 内存
//!
//! 缓冲区与索引节点通过全局分配器分配；分配失败按 Rust 默认行为中止进程。
//! 这是嵌入式控制器上的有意假设，不做额外加固。

use crate::config::RegistryConfig;
use crate::dispatch::{dispatch_loop, meta_entries};
use crate::entry::EntrySpec;
use crate::error::RegistryError;
use crate::handler::EntryHandler;
use crate::portal::{Portal, PortalHandle, PortalId};
use crate::transport::{Clock, LineSink, LineSource, MonotonicClock, StdioTransport};
use flywheel_protocol::{Command, format_line, parse_command, truncate_to};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 根 portal 中诊断条目的 key
pub const ERROR_KEY: &str = "error";

/// 待广播的一行（锁外写出）
struct Broadcast {
    id: String,
    key: String,
    message: String,
}

#[derive(Default)]
struct RegistryInner {
    /// portal 存储区，`PortalId` 为下标
    portals: Vec<Portal>,
    /// 按 id 字典序的索引
    index: BTreeMap<String, PortalId>,
    /// 尚未就绪的 portal 数量
    pending: usize,
    /// 根对象已调用 `ready()`
    sealed: bool,
}

impl RegistryInner {
    fn is_ready(&self) -> bool {
        self.sealed && self.pending == 0
    }

    fn portal(&self, pid: PortalId) -> Result<&Portal, RegistryError> {
        self.portals.get(pid.0).ok_or_else(|| unknown_id(pid))
    }

    fn portal_mut(&mut self, pid: PortalId) -> Result<&mut Portal, RegistryError> {
        self.portals.get_mut(pid.0).ok_or_else(|| unknown_id(pid))
    }

    fn insert_portal(&mut self, id: &str) -> PortalId {
        let pid = PortalId(self.portals.len());
        self.portals.push(Portal::new(id));
        self.index.insert(id.to_string(), pid);
        self.pending += 1;
        pid
    }

    fn mark_ready(&mut self, pid: PortalId) -> Result<(), RegistryError> {
        let portal = self.portal_mut(pid)?;
        if !portal.ready {
            portal.ready = true;
            self.pending -= 1;
        }
        Ok(())
    }

    fn set_entry(
        &mut self,
        pid: PortalId,
        key: &str,
        text: &str,
        max_len: usize,
    ) -> Result<Option<Broadcast>, RegistryError> {
        let portal = self.portal_mut(pid)?;
        if !portal.enabled {
            return Ok(None);
        }
        let portal_onchange = portal.onchange;
        let portal_id = portal.id.clone();

        let entry = portal.entry_mut(key)?;
        let Some(buffer) = entry.buffer.as_mut() else {
            return Err(RegistryError::BufferMissing {
                portal: portal_id,
                key: key.to_string(),
            });
        };
        buffer.clear();
        buffer.push_str(truncate_to(text, max_len));

        if portal_onchange && entry.onchange {
            Ok(Some(Broadcast {
                id: portal_id,
                key: entry.key.clone(),
                message: buffer.clone(),
            }))
        } else {
            Ok(None)
        }
    }
}

fn unknown_id(pid: PortalId) -> RegistryError {
    RegistryError::UnknownPortal {
        id: format!("#{}", pid.0),
    }
}

/// 注册表
///
/// 总是以 `Arc<Registry>` 形式存在（见 [`RegistryBuilder::build`]）。
pub struct Registry {
    me: Weak<Registry>,
    inner: Mutex<RegistryInner>,
    source: Arc<dyn LineSource>,
    sink: Arc<dyn LineSink>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
    root: PortalId,
    dispatch_started: AtomicBool,
}

impl Registry {
    fn new(
        source: Arc<dyn LineSource>,
        sink: Arc<dyn LineSink>,
        clock: Arc<dyn Clock>,
        config: RegistryConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Registry>| {
            let mut inner = RegistryInner::default();
            let root = inner.insert_portal(&config.root_id);
            if let Ok(portal) = inner.portal_mut(root) {
                for spec in meta_entries(me) {
                    if let Err(e) = portal.insert(spec) {
                        warn!("Failed to register meta entry: {}", e);
                    }
                }
                portal.enable();
            }
            if let Err(e) = inner.mark_ready(root) {
                warn!("Failed to mark root portal ready: {}", e);
            }

            Registry {
                me: me.clone(),
                inner: Mutex::new(inner),
                source,
                sink,
                clock,
                config,
                root,
                dispatch_started: AtomicBool::new(false),
            }
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// 根 portal 句柄
    pub fn root(&self) -> PortalId {
        self.root
    }

    // ==================== 结构 ====================

    /// 创建 portal
    ///
    /// id 已存在时返回已有 portal（记录警告，不覆盖）。
    /// 注册表全局就绪之后不再接受新 portal。
    pub fn create_portal(&self, id: &str) -> Result<PortalId, RegistryError> {
        let result = {
            let mut inner = self.inner.lock();
            if let Some(&pid) = inner.index.get(id) {
                warn!("Portal '{}' already exists, returning existing portal", id);
                Ok(pid)
            } else if inner.is_ready() {
                Err(RegistryError::RegistryReady { id: id.to_string() })
            } else {
                debug!("Created portal '{}'", id);
                Ok(inner.insert_portal(id))
            }
        };
        self.checked(result)
    }

    /// 创建 portal 并返回句柄
    pub fn create(self: &Arc<Self>, id: &str) -> Result<PortalHandle, RegistryError> {
        let pid = self.create_portal(id)?;
        Ok(PortalHandle::new(Arc::clone(self), pid))
    }

    /// 为已有 portal 构造句柄
    pub fn handle(self: &Arc<Self>, pid: PortalId) -> PortalHandle {
        PortalHandle::new(Arc::clone(self), pid)
    }

    /// 按 id 查找 portal（不上报错误）
    pub fn find_portal(&self, id: &str) -> Option<PortalId> {
        self.inner.lock().index.get(id).copied()
    }

    pub fn portal_name(&self, pid: PortalId) -> Option<String> {
        self.inner.lock().portal(pid).ok().map(|p| p.id.clone())
    }

    /// 注册条目
    ///
    /// portal 已就绪或 key 重复时失败，不产生任何改动。
    pub fn add_entry(&self, pid: PortalId, spec: EntrySpec) -> Result<(), RegistryError> {
        let result = self
            .inner
            .lock()
            .portal_mut(pid)
            .and_then(|portal| portal.insert(spec));
        self.checked(result)
    }

    /// 批量注册条目
    ///
    /// 逐个注册，单个失败不影响其余条目；返回第一个错误。
    pub fn add_batch(
        &self,
        pid: PortalId,
        specs: impl IntoIterator<Item = EntrySpec>,
    ) -> Result<(), RegistryError> {
        let mut first_error = None;
        for spec in specs {
            if let Err(e) = self.add_entry(pid, spec) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ==================== 值 ====================

    /// 写入条目文本
    ///
    /// portal 禁用时为空操作。文本截断到行长度上限。
    pub fn set_entry(&self, pid: PortalId, key: &str, text: &str) -> Result<(), RegistryError> {
        let max = self.config.wire.max_text_len();
        let result = self.inner.lock().set_entry(pid, key, text, max);
        let broadcast = self.checked(result)?;
        self.emit(broadcast);
        Ok(())
    }

    /// 通过处理器刷新条目文本
    ///
    /// portal 禁用时为空操作；没有处理器的条目保持原文本。
    pub fn update_entry(&self, pid: PortalId, key: &str) -> Result<(), RegistryError> {
        let lookup = {
            let inner = self.inner.lock();
            inner.portal(pid).and_then(|portal| {
                if !portal.enabled {
                    return Ok(None);
                }
                let entry = portal.entry(key)?;
                if entry.buffer.is_none() {
                    return Err(RegistryError::BufferMissing {
                        portal: portal.id.clone(),
                        key: key.to_string(),
                    });
                }
                Ok(Some((entry.handler.clone(), entry.buffer.clone().unwrap_or_default())))
            })
        };
        let Some((handler, current)) = self.checked(lookup)? else {
            return Ok(());
        };

        let text = handler
            .and_then(|h| h.handle(None))
            .unwrap_or(current);
        self.set_entry(pid, key, &text)
    }

    /// 条目当前文本（portal 禁用时为 `None`）
    pub fn entry_text(&self, pid: PortalId, key: &str) -> Result<Option<String>, RegistryError> {
        let inner = self.inner.lock();
        let portal = inner.portal(pid)?;
        Ok(portal.entry(key)?.buffer.clone())
    }

    /// 输出一行流式遥测
    ///
    /// 拼接全部流式条目的当前文本，路径为 portal id。
    /// 没有流式条目、portal 禁用或关闭了流式输出时为空操作。
    pub fn flush(&self, pid: PortalId) -> Result<(), RegistryError> {
        let result = {
            let inner = self.inner.lock();
            inner.portal(pid).and_then(|portal| {
                if !portal.enabled || !portal.stream {
                    return Ok(None);
                }
                Ok(portal.stream_text()?.map(|message| Broadcast {
                    id: portal.id.clone(),
                    key: String::new(),
                    message,
                }))
            })
        };
        let broadcast = self.checked(result)?;
        self.emit(broadcast);
        Ok(())
    }

    // ==================== 生命周期 ====================

    /// 使能 portal：分配全部缓冲区并清空
    pub fn enable(&self, pid: PortalId) -> Result<(), RegistryError> {
        let result = self.inner.lock().portal_mut(pid).map(|portal| {
            portal.enable();
            debug!("Enabled portal '{}'", portal.id);
        });
        self.checked(result)
    }

    /// 禁用 portal：释放全部缓冲区
    pub fn disable(&self, pid: PortalId) -> Result<(), RegistryError> {
        let result = self.inner.lock().portal_mut(pid).map(|portal| {
            portal.disable();
            debug!("Disabled portal '{}'", portal.id);
        });
        self.checked(result)
    }

    pub fn is_enabled(&self, pid: PortalId) -> bool {
        self.inner.lock().portal(pid).is_ok_and(|p| p.enabled)
    }

    /// 冻结 portal 的 schema，并检查全局就绪
    pub fn mark_ready(&self, pid: PortalId) -> Result<(), RegistryError> {
        let result = {
            let mut inner = self.inner.lock();
            inner.mark_ready(pid).map(|()| inner.is_ready())
        };
        let ready = self.checked(result)?;
        self.start_dispatch_if(ready);
        Ok(())
    }

    /// 标记根对象完成搭建
    ///
    /// 此后一旦全部 portal 就绪，分发线程即被启动（仅一次）。
    pub fn ready(&self) {
        let ready = {
            let mut inner = self.inner.lock();
            inner.sealed = true;
            inner.is_ready()
        };
        self.start_dispatch_if(ready);
    }

    /// 全局就绪（根对象已就绪且全部 portal 已就绪）
    ///
    /// 一旦为 `true` 便不会再变回 `false`。
    pub fn is_ready(&self) -> bool {
        self.inner.lock().is_ready()
    }

    /// 分发线程是否已启动
    pub fn is_dispatching(&self) -> bool {
        self.dispatch_started.load(Ordering::Acquire)
    }

    fn start_dispatch_if(&self, ready: bool) {
        if !ready || self.dispatch_started.swap(true, Ordering::AcqRel) {
            return;
        }

        let registry = self.me.clone();
        let source = Arc::clone(&self.source);
        let pause = Duration::from_millis(self.config.dispatch_yield_ms);
        let spawned = thread::Builder::new()
            .name("registry-dispatch".into())
            .spawn(move || dispatch_loop(registry, source, pause));

        match spawned {
            Ok(_) => info!("Registry dispatch task started"),
            Err(e) => error!("Failed to spawn registry dispatch task: {}", e),
        }
    }

    // ==================== 流式子集 ====================

    pub fn stream_keys(&self, pid: PortalId) -> Result<String, RegistryError> {
        let result = self.inner.lock().portal(pid).map(Portal::stream_keys);
        self.checked(result)
    }

    /// 整体替换流式子集（`"k1 k2 ..."`）
    pub fn set_stream_keys(&self, pid: PortalId, sequence: &str) -> Result<(), RegistryError> {
        let result = self
            .inner
            .lock()
            .portal_mut(pid)
            .and_then(|portal| portal.set_stream_keys(sequence));
        self.checked(result)
    }

    /// `keys` 条目的处理器：读返回流式 key，写替换流式子集
    pub fn stream_keys_handler(&self, pid: PortalId) -> Arc<dyn EntryHandler> {
        let registry = self.me.clone();
        Arc::new(move |message: Option<&str>| {
            let registry = registry.upgrade()?;
            match message {
                None | Some("") => registry.stream_keys(pid).ok(),
                Some(sequence) => {
                    let _ = registry.set_stream_keys(pid, sequence);
                    None
                },
            }
        })
    }

    /// 修改 portal 级的流式/变化广播默认值
    pub fn configure(
        &self,
        pid: PortalId,
        stream: Option<bool>,
        onchange: Option<bool>,
    ) -> Result<(), RegistryError> {
        let result = self.inner.lock().portal_mut(pid).map(|portal| {
            if let Some(stream) = stream {
                portal.stream = stream;
            }
            if let Some(onchange) = onchange {
                portal.onchange = onchange;
            }
        });
        self.checked(result)
    }

    // ==================== 命令分发 ====================

    /// 处理一行入站文本
    ///
    /// 分发线程对每一行调用此方法；测试中可直接同步调用。
    pub fn dispatch_line(&self, line: &str) {
        let command = match parse_command(line, &self.config.wire) {
            Ok(Some(command)) => command,
            Ok(None) => return,
            Err(e) => {
                self.report(&e.into());
                return;
            },
        };
        self.dispatch(command);
    }

    fn dispatch(&self, command: Command) {
        let Some(pid) = self.find_portal(&command.portal_id) else {
            self.report(&RegistryError::UnknownPortal {
                id: command.portal_id,
            });
            return;
        };

        let lookup = {
            let inner = self.inner.lock();
            inner
                .portal(pid)
                .and_then(|portal| portal.entry(&command.entry_key))
                .map(|entry| (entry.handler.clone(), entry.manual))
        };
        let (handler, manual) = match lookup {
            Ok(found) => found,
            Err(e) => {
                self.report(&e);
                return;
            },
        };
        let Some(handler) = handler else {
            trace!(
                "Entry '{}.{}' has no handler, dropping command",
                command.portal_id, command.entry_key
            );
            return;
        };

        let response = handler.handle(command.message.as_deref());

        if !manual {
            // 错误已在 update_entry 内部上报
            let _ = self.update_entry(pid, &command.entry_key);
        }

        if let Some(text) = response.filter(|t| !t.is_empty()) {
            self.write_line(&command.portal_id, &command.entry_key, &text);
        }
    }

    // ==================== 输出与诊断 ====================

    fn emit(&self, broadcast: Option<Broadcast>) {
        if let Some(b) = broadcast {
            self.write_line(&b.id, &b.key, &b.message);
        }
    }

    fn write_line(&self, id: &str, key: &str, message: &str) {
        let line = format_line(self.clock.millis(), id, key, message, &self.config.wire);
        self.sink.write_line(&line);
    }

    fn checked<T>(&self, result: Result<T, RegistryError>) -> Result<T, RegistryError> {
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// 上报错误：记录警告并写入根 portal 的 `error` 条目
    ///
    /// 调用时不得持有内部锁。
    pub(crate) fn report(&self, err: &RegistryError) {
        warn!("{}", err);
        let max = self.config.wire.max_text_len();
        let result = self
            .inner
            .lock()
            .set_entry(self.root, ERROR_KEY, &err.to_string(), max);
        if let Ok(broadcast) = result {
            self.emit(broadcast);
        }
    }
}

/// 注册表构建器
///
/// # 示例
///
/// ```rust
/// use flywheel_registry::RegistryBuilder;
/// use flywheel_registry::transport::channel_transport;
///
/// let (transport, peer) = channel_transport();
/// let registry = RegistryBuilder::new().transport(transport).build();
///
/// registry.dispatch_line("registry.keys registry");
/// assert!(peer.try_recv_line().is_some());
/// ```
pub struct RegistryBuilder {
    source: Arc<dyn LineSource>,
    sink: Arc<dyn LineSink>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
}

impl RegistryBuilder {
    /// 默认使用标准输入/输出与单调时钟
    pub fn new() -> Self {
        Self {
            source: Arc::new(StdioTransport),
            sink: Arc::new(StdioTransport),
            clock: Arc::new(MonotonicClock),
            config: RegistryConfig::default(),
        }
    }

    /// 同时作为入站与出站的传输
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: LineSource + LineSink + 'static,
    {
        let transport = Arc::new(transport);
        self.source = transport.clone();
        self.sink = transport;
        self
    }

    pub fn source(mut self, source: impl LineSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    pub fn sink(mut self, sink: impl LineSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Arc<Registry> {
        Registry::new(self.source, self.sink, self.clock, self.config)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
