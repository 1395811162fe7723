//! 数值与线路文本之间的转换
//!
//! | 类型 | 输出 | 输入 |
//! |------|------|------|
//! | `f32` | 固定 6 位小数（`-123.000000`） | 十进制浮点 |
//! | `i32` / `u32` / `u64` | 十进制整数 | 十进制整数（无符号类型拒绝负号） |
//! | `bool` | `true` / `false` | 仅接受 `true` / `false` |

use crate::constants::{FALSE_TEXT, TRUE_TEXT};

/// 可在线路上传输的值
pub trait WireValue: Copy + Send + Sync + 'static {
    /// 渲染为线路文本
    fn render(&self) -> String;

    /// 从线路文本解析（失败返回 `None`）
    fn parse_wire(text: &str) -> Option<Self>;
}

impl WireValue for f32 {
    fn render(&self) -> String {
        format!("{:.6}", self)
    }

    fn parse_wire(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl WireValue for i32 {
    fn render(&self) -> String {
        self.to_string()
    }

    fn parse_wire(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl WireValue for u32 {
    fn render(&self) -> String {
        self.to_string()
    }

    fn parse_wire(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl WireValue for u64 {
    fn render(&self) -> String {
        self.to_string()
    }

    fn parse_wire(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl WireValue for bool {
    fn render(&self) -> String {
        let text = if *self { TRUE_TEXT } else { FALSE_TEXT };
        text.to_string()
    }

    fn parse_wire(text: &str) -> Option<Self> {
        match text.trim() {
            TRUE_TEXT => Some(true),
            FALSE_TEXT => Some(false),
            _ => None,
        }
    }
}
