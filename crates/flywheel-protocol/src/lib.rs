//! # Flywheel Protocol
//!
//! 注册表文本协议定义（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量（行长度、对齐宽度、分隔符）
//! - `line`: 出站遥测行格式化
//! - `command`: 入站命令行解析
//! - `value`: 数值与文本之间的转换
//!
//! ## 行格式
//!
//! ```text
//! 出站: [<8 位毫秒时间戳>|<portal.entry 左对齐补空格>] <message>
//! 入站: <portal>.<entry>[ <message>]
//! ```
//!
//! 入站行不带 `<message>` 表示"读取当前值"。

pub mod command;
pub mod constants;
pub mod line;
pub mod value;

// 重新导出常用类型
pub use command::{Command, parse_command};
pub use constants::*;
pub use line::{WireConfig, aligned_width, format_line, format_path, truncate_to};
pub use value::WireValue;

use thiserror::Error;

/// 协议层错误类型
///
/// 所有错误都是非致命的：调用方记录后丢弃该行即可。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 入站行超过配置的最大行长度
    #[error("Line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    /// 路径中缺少 `.` 或 `.` 之后为空
    #[error("Malformed command path '{path}': missing entry key")]
    MissingEntryKey { path: String },

    /// 路径中 `.` 之前为空
    #[error("Malformed command path '{path}': empty portal id")]
    EmptyPortalId { path: String },
}
