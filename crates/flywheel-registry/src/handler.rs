//! 条目处理器
//!
//! 处理器在两种场合被调用：
//!
//! - 入站命令：`handle(Some(msg))` 写入，`handle(None)` 读取
//! - `update_entry`：`handle(None)`，返回值刷新条目缓冲区
//!
//! 返回 `Some(text)` 表示有响应文本；`None` 表示无响应。

use flywheel_protocol::WireValue;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// 条目处理器 Trait
///
/// 处理器可能在分发线程上被调用，必须是 `Send + Sync`。
/// 处理器执行期间注册表锁已释放，可以回调注册表。
pub trait EntryHandler: Send + Sync {
    /// 处理一条消息（`None` 表示读取）
    fn handle(&self, message: Option<&str>) -> Option<String>;
}

impl<F> EntryHandler for F
where
    F: Fn(Option<&str>) -> Option<String> + Send + Sync,
{
    fn handle(&self, message: Option<&str>) -> Option<String> {
        self(message)
    }
}

/// 跨线程共享的可变值
///
/// 控制律的参数与内部状态都以 `SharedValue` 持有，
/// 这样注册表处理器与控制任务看到的是同一个值。
#[derive(Debug, Default)]
pub struct SharedValue<T>(Arc<Mutex<T>>);

impl<T> Clone for SharedValue<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Copy> SharedValue<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    pub fn get(&self) -> T {
        *self.0.lock()
    }

    pub fn set(&self, value: T) {
        *self.0.lock() = value;
    }

    /// 读-改-写，返回新值
    pub fn update(&self, f: impl FnOnce(T) -> T) -> T {
        let mut guard = self.0.lock();
        *guard = f(*guard);
        *guard
    }
}

/// 为共享值构造读写处理器
///
/// - 空消息：返回当前值的线路文本
/// - 可解析的消息：写入，不返回响应
/// - 无法解析的消息：忽略并记录警告
pub fn value_handler<T: WireValue>(cell: SharedValue<T>) -> Arc<dyn EntryHandler> {
    Arc::new(move |message: Option<&str>| match message {
        None | Some("") => Some(cell.get().render()),
        Some(text) => {
            match T::parse_wire(text) {
                Some(value) => cell.set(value),
                None => warn!("Rejected value '{}'", text),
            }
            None
        },
    })
}

/// 为 getter/setter 对构造读写处理器
///
/// 与 [`value_handler`] 语义相同，但读写都经由闭包，
/// 适合值保存在别处（例如快照或锁保护的状态）的场合。
pub fn accessor_handler<T, G, S>(get: G, set: S) -> Arc<dyn EntryHandler>
where
    T: WireValue,
    G: Fn() -> T + Send + Sync + 'static,
    S: Fn(T) + Send + Sync + 'static,
{
    Arc::new(move |message: Option<&str>| match message {
        None | Some("") => Some(get().render()),
        Some(text) => {
            match T::parse_wire(text) {
                Some(value) => set(value),
                None => warn!("Rejected value '{}'", text),
            }
            None
        },
    })
}

/// 只读处理器：忽略写入，始终返回当前值
pub fn read_only_handler<T, G>(get: G) -> Arc<dyn EntryHandler>
where
    T: WireValue,
    G: Fn() -> T + Send + Sync + 'static,
{
    Arc::new(move |_: Option<&str>| Some(get().render()))
}
