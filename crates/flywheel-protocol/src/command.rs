//! 入站命令行解析
//!
//! 语法：`<portal>.<entry>[ <message>]`
//!
//! - 整行先去除首尾空白，空行被忽略
//! - 第一个空白字符之前为路径，之后（去除首尾空白）为消息
//! - 路径在第一个 `.` 处拆分为 portal id 和 entry key

use crate::ProtocolError;
use crate::constants::PATH_SEPARATOR;
use crate::line::WireConfig;

/// 解析后的入站命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// 目标 portal id
    pub portal_id: String,
    /// 目标 entry key
    pub entry_key: String,
    /// 消息正文（`None` 表示读取当前值）
    pub message: Option<String>,
}

impl Command {
    /// 是否为读取命令
    pub fn is_read(&self) -> bool {
        self.message.is_none()
    }
}

/// 解析一行入站文本
///
/// # 返回
///
/// - `Ok(Some(cmd))`: 有效命令
/// - `Ok(None)`: 空行（忽略）
/// - `Err(e)`: 行过长或路径格式错误
///
/// # 示例
///
/// ```rust
/// use flywheel_protocol::{WireConfig, parse_command};
///
/// let cmd = parse_command("flywheel.target 2400", &WireConfig::default())
///     .unwrap()
///     .unwrap();
/// assert_eq!(cmd.portal_id, "flywheel");
/// assert_eq!(cmd.entry_key, "target");
/// assert_eq!(cmd.message.as_deref(), Some("2400"));
/// ```
pub fn parse_command(line: &str, config: &WireConfig) -> Result<Option<Command>, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let max = config.max_text_len();
    if trimmed.len() > max {
        return Err(ProtocolError::LineTooLong {
            len: trimmed.len(),
            max,
        });
    }

    let (path, message) = match trimmed.split_once(char::is_whitespace) {
        Some((path, rest)) => (path, Some(rest.trim())),
        None => (trimmed, None),
    };
    let message = message.filter(|m| !m.is_empty()).map(str::to_string);

    let Some((portal_id, entry_key)) = path.split_once(PATH_SEPARATOR) else {
        return Err(ProtocolError::MissingEntryKey {
            path: path.to_string(),
        });
    };

    if portal_id.is_empty() {
        return Err(ProtocolError::EmptyPortalId {
            path: path.to_string(),
        });
    }
    if entry_key.is_empty() {
        return Err(ProtocolError::MissingEntryKey {
            path: path.to_string(),
        });
    }

    Ok(Some(Command {
        portal_id: portal_id.to_string(),
        entry_key: entry_key.to_string(),
        message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(line: &str) -> Result<Option<Command>, ProtocolError> {
        parse_command(line, &WireConfig::default())
    }

    #[test]
    fn test_parse_write_command() {
        let cmd = parse("flywheel.target 100").unwrap().unwrap();
        assert_eq!(cmd.portal_id, "flywheel");
        assert_eq!(cmd.entry_key, "target");
        assert_eq!(cmd.message.as_deref(), Some("100"));
        assert!(!cmd.is_read());
    }

    #[test]
    fn test_parse_read_command() {
        let cmd = parse("flywheel.measured").unwrap().unwrap();
        assert_eq!(cmd.entry_key, "measured");
        assert!(cmd.is_read());
    }

    #[test]
    fn test_parse_trims_surrounding_whitespace() {
        let cmd = parse("  registry.enable   flywheel intake \r\n").unwrap().unwrap();
        assert_eq!(cmd.portal_id, "registry");
        assert_eq!(cmd.entry_key, "enable");
        // 消息内部的空格保留
        assert_eq!(cmd.message.as_deref(), Some("flywheel intake"));
    }

    #[test]
    fn test_parse_trailing_space_is_read() {
        let cmd = parse("flywheel.target   ").unwrap().unwrap();
        assert!(cmd.is_read());
    }

    #[test]
    fn test_parse_empty_line_ignored() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \n").unwrap(), None);
    }

    #[test]
    fn test_parse_key_keeps_later_separators() {
        let cmd = parse("a.b.c 1").unwrap().unwrap();
        assert_eq!(cmd.portal_id, "a");
        assert_eq!(cmd.entry_key, "b.c");
    }

    #[test]
    fn test_parse_malformed_paths() {
        assert!(matches!(
            parse("flywheel 100"),
            Err(ProtocolError::MissingEntryKey { .. })
        ));
        assert!(matches!(
            parse("flywheel."),
            Err(ProtocolError::MissingEntryKey { .. })
        ));
        assert!(matches!(
            parse(".target 5"),
            Err(ProtocolError::EmptyPortalId { .. })
        ));
    }

    #[test]
    fn test_parse_line_too_long() {
        let config = WireConfig {
            line_size: 16,
            align_size: 8,
        };
        let result = parse_command("flywheel.target 123456789", &config);
        assert_eq!(
            result,
            Err(ProtocolError::LineTooLong { len: 25, max: 15 })
        );
    }

    proptest! {
        #[test]
        fn prop_command_path_splits_at_first_dot(
            id in "[a-z][a-z0-9-]{0,20}",
            key in "[a-z][a-z0-9.-]{0,20}",
            message in "[a-z0-9]{1,20}",
        ) {
            let line = format!("{}.{} {}", id, key, message);
            let command = parse(&line).unwrap().unwrap();
            prop_assert_eq!(command.portal_id, id);
            prop_assert_eq!(command.entry_key, key);
            prop_assert_eq!(command.message, Some(message));
        }
    }
}
