//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中声明帧写出、帧读取与配置加载三条路径上的错误语义；
//! - 输出端（sink）错误在边界处即被分类为“对端关闭”或“其他故障”，写出器据此决定吞掉或上抛，
//!   而不是事后检查被包裹的底层原因。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，兼容 `std::error::Error` 与 `?` 传播；
//! - 每个变体暴露稳定错误码（参见 [`codes`]），遵循 `<域>.<语义>` 命名，便于日志与告警聚合。

use std::{fmt, io};

use thiserror::Error;

use crate::writer::FrameStage;

/// 稳定错误码表。
///
/// 码值一经发布不可修改；新增码值只能追加。
pub mod codes {
    /// 写出过程中发生非断开类 IO 故障。
    pub const WRITE_IO: &str = "pagewire.write.io";
    /// 页数量超出帧头 32 位计数字段。
    pub const WRITE_PAGE_COUNT_OVERFLOW: &str = "pagewire.write.page_count_overflow";
    /// 类型擦除入口收到的负载不是页序列。
    pub const WRITE_PAYLOAD_MISMATCH: &str = "pagewire.write.payload_mismatch";
    /// 帧魔数不匹配。
    pub const FRAME_BAD_MAGIC: &str = "pagewire.frame.bad_magic";
    /// 帧字节不足。
    pub const FRAME_TRUNCATED: &str = "pagewire.frame.truncated";
    /// 帧声明的页数与调用方提供的页长度列表不一致。
    pub const FRAME_PAGE_COUNT_MISMATCH: &str = "pagewire.frame.page_count_mismatch";
    /// 页字节总长与帧剩余长度不一致。
    pub const FRAME_TRAILING_BYTES: &str = "pagewire.frame.trailing_bytes";
    /// 完整性校验失败。
    pub const FRAME_CHECKSUM_MISMATCH: &str = "pagewire.frame.checksum_mismatch";
    /// 配置文件无法读取。
    pub const CONFIG_IO: &str = "pagewire.config.io";
    /// 配置内容无法解析。
    pub const CONFIG_INVALID: &str = "pagewire.config.invalid";
}

/// 输出端错误的分类。
///
/// - `PeerClosed`：对端在写出途中关闭连接（EOF、Broken pipe、连接重置等），属于客户端行为；
/// - `Fault`：其余所有故障，视为服务端问题。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SinkErrorKind {
    /// 对端已关闭连接。
    PeerClosed,
    /// 非断开类故障。
    Fault,
}

impl SinkErrorKind {
    /// 返回稳定的字符串表示。
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer closed",
            Self::Fault => "fault",
        }
    }
}

impl fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 输出端在边界处分类后的错误。
///
/// # 教案式说明
/// - **意图 (Why)**：写出器只需匹配 [`SinkErrorKind`] 即可决定是否吞掉错误，
///   不必向下转型或解析错误消息；
/// - **契约 (What)**：`operation` 为触发错误的输出端操作（如 `"write"`、`"flush"`），
///   `source` 保留原始 IO 错误以便排障；
/// - **执行 (How)**：由 [`SinkError::classify`] 根据 `io::ErrorKind` 选择分类，
///   传输实现也可通过 [`SinkError::peer_closed`] / [`SinkError::fault`] 显式构造。
#[derive(Debug, Error)]
#[error("sink {operation} failed ({kind}): {source}")]
pub struct SinkError {
    kind: SinkErrorKind,
    operation: &'static str,
    #[source]
    source: io::Error,
}

impl SinkError {
    /// 构造对端关闭错误。
    pub fn peer_closed(operation: &'static str, source: io::Error) -> Self {
        Self {
            kind: SinkErrorKind::PeerClosed,
            operation,
            source,
        }
    }

    /// 构造非断开类故障。
    pub fn fault(operation: &'static str, source: io::Error) -> Self {
        Self {
            kind: SinkErrorKind::Fault,
            operation,
            source,
        }
    }

    /// 依据 `io::ErrorKind` 对底层错误分类。
    ///
    /// `UnexpectedEof`、`BrokenPipe`、`ConnectionReset`、`ConnectionAborted` 与 `NotConnected`
    /// 归入对端关闭，其余一律视为故障。
    pub fn classify(operation: &'static str, source: io::Error) -> Self {
        if is_peer_closed(&source) {
            Self::peer_closed(operation, source)
        } else {
            Self::fault(operation, source)
        }
    }

    /// 错误分类。
    pub fn kind(&self) -> SinkErrorKind {
        self.kind
    }

    /// 是否为对端关闭。
    pub fn is_peer_closed(&self) -> bool {
        self.kind == SinkErrorKind::PeerClosed
    }

    /// 触发错误的输出端操作。
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// 原始 IO 错误。
    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}

/// 判断 IO 错误是否代表对端关闭连接。
pub fn is_peer_closed(error: &io::Error) -> bool {
    use io::ErrorKind;
    matches!(
        error.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
    )
}

/// 帧写出失败。
///
/// 对端关闭不会出现在这里：写出器把它折叠为 [`WriteOutcome::PeerClosed`](crate::WriteOutcome)。
#[derive(Debug, Error)]
pub enum WriteError {
    /// 输出端在某一步骤报告了非断开类故障。
    ///
    /// `stage` 标明失败发生在帧的哪一部分，整帧视为未发送。
    #[error("pages frame write failed at {stage}: {source}")]
    Io {
        /// 失败步骤。
        stage: FrameStage,
        /// 输出端错误。
        #[source]
        source: SinkError,
    },

    /// 页数量无法放入 32 位计数字段，未写出任何字节。
    #[error("page sequence of {count} pages exceeds the frame page-count field")]
    PageCountOverflow {
        /// 实际页数量。
        count: usize,
    },

    /// 类型擦除入口收到了非页序列负载。
    #[error("payload type mismatch: expected `{expected}`")]
    PayloadMismatch {
        /// 期望的负载类型名。
        expected: &'static str,
    },
}

impl WriteError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => codes::WRITE_IO,
            Self::PageCountOverflow { .. } => codes::WRITE_PAGE_COUNT_OVERFLOW,
            Self::PayloadMismatch { .. } => codes::WRITE_PAYLOAD_MISMATCH,
        }
    }

    /// 失败步骤；仅 IO 故障携带。
    pub fn stage(&self) -> Option<FrameStage> {
        match self {
            Self::Io { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// 帧读取与校验失败。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// 魔数不匹配。
    #[error("unexpected frame magic 0x{found:08X}")]
    BadMagic {
        /// 实际读到的魔数。
        found: u32,
    },
    /// 字节不足。
    #[error("frame truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// 需要的字节数。
        needed: usize,
        /// 可用的字节数。
        available: usize,
    },
    /// 帧头声明的页数与页长度列表不一致。
    #[error("frame declares {declared} pages but {provided} page lengths were provided")]
    PageCountMismatch {
        /// 帧头声明的页数。
        declared: u32,
        /// 调用方提供的页长度数量。
        provided: usize,
    },
    /// 页字节之后仍有多余字节。
    #[error("frame has {extra} trailing bytes after the last page")]
    TrailingBytes {
        /// 多余字节数。
        extra: usize,
    },
    /// 校验和不匹配。
    #[error("checksum mismatch: frame carries 0x{expected:016X}, pages hash to 0x{actual:016X}")]
    ChecksumMismatch {
        /// 帧头携带的值。
        expected: u64,
        /// 按页重新计算的值。
        actual: u64,
    },
}

impl FrameError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadMagic { .. } => codes::FRAME_BAD_MAGIC,
            Self::Truncated { .. } => codes::FRAME_TRUNCATED,
            Self::PageCountMismatch { .. } => codes::FRAME_PAGE_COUNT_MISMATCH,
            Self::TrailingBytes { .. } => codes::FRAME_TRAILING_BYTES,
            Self::ChecksumMismatch { .. } => codes::FRAME_CHECKSUM_MISMATCH,
        }
    }
}

/// 配置加载失败；属于启动期致命错误，而非单次请求错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败。
    #[error("failed to read exchange configuration `{path}`: {source}")]
    Io {
        /// 配置文件路径。
        path: String,
        /// 底层 IO 错误。
        #[source]
        source: io::Error,
    },
    /// 配置内容无法解析。
    #[error("invalid exchange configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => codes::CONFIG_IO,
            Self::Parse(_) => codes::CONFIG_INVALID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_separates_disconnects_from_faults() {
        for kind in [
            io::ErrorKind::UnexpectedEof,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::NotConnected,
        ] {
            let err = SinkError::classify("write", io::Error::from(kind));
            assert!(err.is_peer_closed(), "{kind:?} 应视为对端关闭");
        }

        for kind in [
            io::ErrorKind::PermissionDenied,
            io::ErrorKind::TimedOut,
            io::ErrorKind::WriteZero,
            io::ErrorKind::Other,
            io::ErrorKind::OutOfMemory,
        ] {
            let err = SinkError::classify("write", io::Error::from(kind));
            assert_eq!(err.kind(), SinkErrorKind::Fault, "{kind:?} 应视为故障");
        }
    }

    #[test]
    fn sink_error_keeps_operation_and_source() {
        let err = SinkError::fault("flush", io::Error::other("disk on fire"));
        assert_eq!(err.operation(), "flush");
        assert_eq!(err.io_error().kind(), io::ErrorKind::Other);
        assert!(err.to_string().contains("flush"));
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn write_error_codes_are_stable() {
        let io = WriteError::Io {
            stage: FrameStage::Flush,
            source: SinkError::fault("flush", io::Error::other("x")),
        };
        assert_eq!(io.code(), codes::WRITE_IO);
        assert_eq!(io.stage(), Some(FrameStage::Flush));

        let overflow = WriteError::PageCountOverflow { count: 1 };
        assert_eq!(overflow.code(), codes::WRITE_PAGE_COUNT_OVERFLOW);
        assert_eq!(overflow.stage(), None);
    }
}
