//! 出站遥测行格式化
//!
//! ```text
//! [00000005|flywheel.target ] 100
//!  ^^^^^^^^ ^^^^^^^^^^^^^^^^  ^^^
//!  毫秒     路径（对齐补空格）  消息
//! ```
//!
//! 路径宽度向上取整到 `align_size` 的整数倍，且不超过 `line_size - 1`。
//! 整行同样截断到 `line_size - 1` 字节。

use crate::constants::{ALIGN_SIZE, LINE_SIZE, PATH_SEPARATOR, TIMESTAMP_WIDTH};

/// 线路格式配置
///
/// 所有出站行共享同一份配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WireConfig {
    /// 单行最大长度（字节，含结束位）
    pub line_size: usize,
    /// 路径对齐单位
    pub align_size: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            line_size: LINE_SIZE,
            align_size: ALIGN_SIZE,
        }
    }
}

impl WireConfig {
    /// 行内可用的最大字节数（不含结束位）
    pub fn max_text_len(&self) -> usize {
        self.line_size.saturating_sub(1)
    }
}

/// 组合路径
///
/// `key` 为空时只输出 `id`（用于流式整行输出）。
pub fn format_path(id: &str, key: &str) -> String {
    if key.is_empty() {
        id.to_string()
    } else {
        format!("{}{}{}", id, PATH_SEPARATOR, key)
    }
}

/// 计算路径的显示宽度
pub fn aligned_width(path_len: usize, config: &WireConfig) -> usize {
    let align = config.align_size.max(1);
    let width = path_len.div_ceil(align) * align;
    width.min(config.max_text_len())
}

/// 按字节截断字符串（保证落在字符边界上）
pub fn truncate_to(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// 格式化一行出站消息
///
/// # 参数
///
/// - `millis`: 单调毫秒时间
/// - `id`: portal id
/// - `key`: entry key（为空表示整个 portal）
/// - `message`: 消息正文
/// - `config`: 线路格式配置
///
/// # 示例
///
/// ```rust
/// use flywheel_protocol::{WireConfig, format_line};
///
/// let line = format_line(5, "flywheel", "target", "100", &WireConfig::default());
/// assert_eq!(line, "[00000005|flywheel.target ] 100");
/// ```
pub fn format_line(millis: u64, id: &str, key: &str, message: &str, config: &WireConfig) -> String {
    let path = format_path(id, key);
    let path = truncate_to(&path, config.max_text_len());
    let width = aligned_width(path.len(), config);

    // 时间戳按 32 位计数输出，溢出后回绕
    let stamp = millis as u32;

    let line = format!(
        "[{:0ts$}|{:<width$}] {}",
        stamp,
        path,
        message,
        ts = TIMESTAMP_WIDTH,
        width = width
    );
    truncate_to(&line, config.max_text_len()).to_string()
}
