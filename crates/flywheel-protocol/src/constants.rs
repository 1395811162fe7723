//! 协议常量定义

/// 单行最大长度（字节，含结束位）
///
/// 出站行与缓冲区文本最多保留 `LINE_SIZE - 1` 字节。
pub const LINE_SIZE: usize = 128;

/// 路径显示宽度的对齐单位
pub const ALIGN_SIZE: usize = 8;

/// 时间戳显示宽度（零填充）
pub const TIMESTAMP_WIDTH: usize = 8;

/// portal id 与 entry key 之间的分隔符
pub const PATH_SEPARATOR: char = '.';

/// 流式输出中各值之间的分隔符
pub const STREAM_SEPARATOR: &str = " ";

/// 布尔值的文本表示
pub const TRUE_TEXT: &str = "true";
pub const FALSE_TEXT: &str = "false";
