//! 分发线程与根 portal 的元命令
//!
//! 元命令：
//!
//! | 命令 | 作用 |
//! |------|------|
//! | `registry.enable <id> [<id> ...]` | 使能 portal |
//! | `registry.disable <id> [<id> ...]` | 禁用 portal |
//! | `registry.keys <id>` | 返回该 portal 的流式 key 列表 |
//!
//! `registry.error` 没有处理器，只用于承载诊断文本。

use crate::entry::EntrySpec;
use crate::error::{RegistryError, TransportError};
use crate::registry::{ERROR_KEY, Registry};
use crate::transport::LineSource;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{info, warn};

/// 分发循环
///
/// 阻塞读取入站行并逐行处理；每条命令之后让出 `pause`。
/// 传输关闭或注册表被销毁时退出。
pub(crate) fn dispatch_loop(registry: Weak<Registry>, source: Arc<dyn LineSource>, pause: Duration) {
    loop {
        let line = match source.read_line() {
            Ok(line) => line,
            Err(TransportError::Closed) => {
                info!("Registry transport closed, dispatch task exiting");
                break;
            },
            Err(e) => {
                warn!("Registry transport read failed: {}", e);
                std::thread::sleep(pause);
                continue;
            },
        };

        let Some(registry) = registry.upgrade() else {
            break;
        };
        registry.dispatch_line(&line);
        drop(registry);

        std::thread::sleep(pause);
    }
}

/// 根 portal 的元条目
pub(crate) fn meta_entries(registry: &Weak<Registry>) -> Vec<EntrySpec> {
    vec![
        EntrySpec::new("enable").handler(Arc::new(portal_toggle(registry, true))),
        EntrySpec::new("disable").handler(Arc::new(portal_toggle(registry, false))),
        EntrySpec::new("keys").handler(Arc::new(keys_query(registry))),
        EntrySpec::new(ERROR_KEY).onchange(),
    ]
}

fn portal_toggle(
    registry: &Weak<Registry>,
    enable: bool,
) -> impl Fn(Option<&str>) -> Option<String> + Send + Sync + 'static {
    let registry = registry.clone();
    move |message: Option<&str>| {
        let registry = registry.upgrade()?;
        for id in message?.split_whitespace() {
            match registry.find_portal(id) {
                Some(pid) if enable => {
                    let _ = registry.enable(pid);
                },
                Some(pid) => {
                    let _ = registry.disable(pid);
                },
                None => registry.report(&RegistryError::UnknownPortal { id: id.to_string() }),
            }
        }
        None
    }
}

fn keys_query(
    registry: &Weak<Registry>,
) -> impl Fn(Option<&str>) -> Option<String> + Send + Sync + 'static {
    let registry = registry.clone();
    move |message: Option<&str>| {
        let registry = registry.upgrade()?;
        let id = message?.trim();
        match registry.find_portal(id) {
            Some(pid) => registry.stream_keys(pid).ok(),
            None => {
                registry.report(&RegistryError::UnknownPortal { id: id.to_string() });
                None
            },
        }
    }
}
