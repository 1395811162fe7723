//! 注册表错误类型定义
//!
//! 所有错误均为非致命错误：触发错误的操作变为空操作，
//! 错误文本同时写入注册表自身的 `error` 条目。

use flywheel_protocol::ProtocolError;
use thiserror::Error;

/// 注册表错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// portal 已就绪，schema 冻结，不能再添加条目
    #[error("add: portal '{portal}' already ready, ignoring entry '{key}'")]
    SchemaFrozen { portal: String, key: String },

    /// 同一 portal 中 key 重复
    #[error("add: portal '{portal}' already has an entry '{key}'")]
    DuplicateEntry { portal: String, key: String },

    /// 找不到 portal
    #[error("cannot find portal with id '{id}'")]
    UnknownPortal { id: String },

    /// 找不到条目
    #[error("cannot find entry with key '{key}' in portal '{portal}'")]
    UnknownEntry { portal: String, key: String },

    /// 条目缓冲区未分配（portal 已使能但缓冲区缺失）
    #[error("message not allocated for key '{key}' in portal '{portal}'")]
    BufferMissing { portal: String, key: String },

    /// 注册表已全局就绪，不能再创建 portal
    #[error("registry already ready, cannot create portal '{id}'")]
    RegistryReady { id: String },

    /// 命令行格式错误
    #[error("parse: {0}")]
    Protocol(#[from] ProtocolError),
}

/// 传输层错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    /// 通道已关闭（对端退出）
    #[error("Transport closed")]
    Closed,

    /// 底层 IO 错误
    #[error("Transport IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::UnknownPortal {
            id: "intake".to_string(),
        };
        assert_eq!(format!("{}", err), "cannot find portal with id 'intake'");

        let err = RegistryError::UnknownEntry {
            portal: "flywheel".to_string(),
            key: "speed".to_string(),
        };
        assert!(format!("{}", err).contains("'speed'"));

        let err = RegistryError::SchemaFrozen {
            portal: "flywheel".to_string(),
            key: "late".to_string(),
        };
        assert!(format!("{}", err).contains("already ready"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: RegistryError = ProtocolError::MissingEntryKey {
            path: "flywheel".to_string(),
        }
        .into();
        match err {
            RegistryError::Protocol(ProtocolError::MissingEntryKey { path }) => {
                assert_eq!(path, "flywheel")
            },
            _ => panic!("Expected Protocol variant"),
        }
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(format!("{}", TransportError::Closed), "Transport closed");
        let io = std::io::Error::other("boom");
        assert!(format!("{}", TransportError::from(io)).contains("boom"));
    }
}
