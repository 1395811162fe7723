//! 日志初始化
//!
//! 库内部统一使用 `tracing` 宏；二进制与测试通过 [`init_logger`] 安装订阅者。
//! 级别由 `RUST_LOG` 控制，缺省为 `info`。`log` crate 的记录经 `tracing-log`
//! 桥接到同一订阅者。

use tracing_subscriber::EnvFilter;

/// 缺省过滤指令
pub const DEFAULT_FILTER: &str = "info";

/// 安装全局日志订阅者
///
/// 重复调用无副作用。返回本次调用是否完成了安装。
pub fn init_logger() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // `log` 桥接失败只影响第三方 crate 的日志
    let _ = tracing_log::LogTracer::init();
    true
}
