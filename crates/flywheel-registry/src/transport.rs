//! 传输层与时钟能力
//!
//! 注册表只通过三个窄接口与外界交互：
//!
//! - [`LineSource`]: 阻塞读取一行入站文本
//! - [`LineSink`]: 写出一行出站文本
//! - [`Clock`]: 单调时钟
//!
//! 线路假定可靠且有序，一次调用对应一行。

use crate::error::TransportError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::io::{BufRead, Write};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::trace;

/// 入站行来源
pub trait LineSource: Send + Sync {
    /// 阻塞读取下一行
    ///
    /// 返回 `Err(TransportError::Closed)` 表示不会再有输入，分发线程随之退出。
    fn read_line(&self) -> Result<String, TransportError>;
}

/// 出站行去向
pub trait LineSink: Send + Sync {
    /// 写出一行（不含换行符）
    fn write_line(&self, line: &str);
}

/// 单调时钟
pub trait Clock: Send + Sync {
    /// 单调微秒计数
    fn micros(&self) -> u64;

    /// 单调毫秒计数
    fn millis(&self) -> u64 {
        self.micros() / 1000
    }
}

/// 进程启动锚点，首次访问时设置
static APP_START: OnceLock<Instant> = OnceLock::new();

/// 以进程启动为零点的单调时钟
///
/// 不受系统时间调整影响。
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn micros(&self) -> u64 {
        let start = APP_START.get_or_init(Instant::now);
        start.elapsed().as_micros() as u64
    }
}

/// 基于 channel 的进程内传输
///
/// 注册表持有 `ChannelTransport`，对端持有 [`ChannelPeer`]。
pub struct ChannelTransport {
    commands: Receiver<String>,
    lines: Sender<String>,
}

/// [`ChannelTransport`] 的对端
#[derive(Clone)]
pub struct ChannelPeer {
    commands: Sender<String>,
    lines: Receiver<String>,
}

/// 创建一对进程内传输端点
///
/// # 示例
///
/// ```rust
/// use flywheel_registry::transport::{LineSink, channel_transport};
///
/// let (transport, peer) = channel_transport();
/// transport.write_line("[00000000|registry.error  ] hello");
/// assert_eq!(peer.try_recv_line().as_deref(), Some("[00000000|registry.error  ] hello"));
/// ```
pub fn channel_transport() -> (ChannelTransport, ChannelPeer) {
    let (cmd_tx, cmd_rx) = unbounded();
    let (line_tx, line_rx) = unbounded();
    (
        ChannelTransport {
            commands: cmd_rx,
            lines: line_tx,
        },
        ChannelPeer {
            commands: cmd_tx,
            lines: line_rx,
        },
    )
}

impl LineSource for ChannelTransport {
    fn read_line(&self) -> Result<String, TransportError> {
        self.commands.recv().map_err(|_| TransportError::Closed)
    }
}

impl LineSink for ChannelTransport {
    fn write_line(&self, line: &str) {
        if self.lines.send(line.to_string()).is_err() {
            trace!("Channel peer dropped, discarding line: {}", line);
        }
    }
}

impl ChannelPeer {
    /// 发送一条命令
    ///
    /// 注册表已销毁时返回 `false`。
    pub fn send_command(&self, command: impl Into<String>) -> bool {
        self.commands.send(command.into()).is_ok()
    }

    /// 非阻塞读取一行出站文本
    pub fn try_recv_line(&self) -> Option<String> {
        self.lines.try_recv().ok()
    }

    /// 带超时读取一行出站文本
    pub fn recv_line_timeout(&self, timeout: Duration) -> Option<String> {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => Some(line),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// 取出当前已缓冲的全部出站行
    pub fn drain_lines(&self) -> Vec<String> {
        self.lines.try_iter().collect()
    }
}

/// 标准输入/输出传输
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioTransport;

impl LineSource for StdioTransport {
    fn read_line(&self) -> Result<String, TransportError> {
        let mut buf = String::new();
        let read = std::io::stdin().lock().read_line(&mut buf)?;
        if read == 0 {
            return Err(TransportError::Closed);
        }
        Ok(buf)
    }
}

impl LineSink for StdioTransport {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", line) {
            trace!("stdout write failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_non_decreasing() {
        let clock = MonotonicClock;
        let a = clock.micros();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.micros();
        assert!(b >= a + 1000);
        assert!(clock.millis() >= b / 1000);
    }

    #[test]
    fn test_channel_transport_round_trip() {
        let (transport, peer) = channel_transport();

        assert!(peer.send_command("flywheel.target 100"));
        assert_eq!(transport.read_line().unwrap(), "flywheel.target 100");

        transport.write_line("line 1");
        transport.write_line("line 2");
        assert_eq!(peer.drain_lines(), vec!["line 1", "line 2"]);
        assert_eq!(peer.try_recv_line(), None);
    }

    #[test]
    fn test_channel_transport_closed_when_peer_dropped() {
        let (transport, peer) = channel_transport();
        drop(peer);
        assert!(matches!(transport.read_line(), Err(TransportError::Closed)));
        // 对端已关闭时写出不会 panic
        transport.write_line("ignored");
    }
}
