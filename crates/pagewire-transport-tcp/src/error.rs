use std::io;

use pagewire_core::{SinkError, WriteError};
use thiserror::Error;

/// 描述一次底层操作对应的稳定错误码与默认文案。
#[derive(Clone, Copy, Debug)]
pub(crate) struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

pub(crate) const BIND: OperationKind = OperationKind {
    code: "pagewire.transport.tcp.bind_failed",
    message: "tcp bind",
};
pub(crate) const ACCEPT: OperationKind = OperationKind {
    code: "pagewire.transport.tcp.accept_failed",
    message: "tcp accept",
};
pub(crate) const CONNECT: OperationKind = OperationKind {
    code: "pagewire.transport.tcp.connect_failed",
    message: "tcp connect",
};
pub(crate) const WRITE: OperationKind = OperationKind {
    code: "pagewire.transport.tcp.write_failed",
    message: "tcp write",
};
pub(crate) const FLUSH: OperationKind = OperationKind {
    code: "pagewire.transport.tcp.flush_failed",
    message: "tcp flush",
};
pub(crate) const SHUTDOWN: OperationKind = OperationKind {
    code: "pagewire.transport.tcp.shutdown_failed",
    message: "tcp shutdown",
};

/// TCP 通道错误。
///
/// 帧写出途中的对端断开不会出现在这里，而是以
/// [`WriteOutcome::PeerClosed`](pagewire_core::WriteOutcome::PeerClosed) 返回。
#[derive(Debug, Error)]
pub enum ChannelError {
    /// 建连、监听、接受或半关闭失败。
    #[error("{operation} failed: {source}")]
    Io {
        /// 稳定错误码。
        code: &'static str,
        /// 失败的操作。
        operation: &'static str,
        /// 底层 IO 错误。
        #[source]
        source: io::Error,
    },
    /// 帧写出失败。
    #[error(transparent)]
    Frame(#[from] WriteError),
}

impl ChannelError {
    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { code, .. } => *code,
            Self::Frame(err) => err.code(),
        }
    }
}

/// 将帧写出路径上的 IO 错误分类为输出端错误。
pub(crate) fn map_io_error(kind: OperationKind, error: io::Error) -> SinkError {
    SinkError::classify(kind.message, error)
}

/// 构造通道级错误。
pub(crate) fn channel_error(kind: OperationKind, error: io::Error) -> ChannelError {
    ChannelError::Io {
        code: kind.code,
        operation: kind.message,
        source: error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewire_core::{FrameStage, SinkErrorKind, codes};

    #[test]
    fn write_path_errors_keep_disconnect_classification() {
        let err = map_io_error(WRITE, io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(err.kind(), SinkErrorKind::PeerClosed);
        assert_eq!(err.operation(), "tcp write");

        let err = map_io_error(FLUSH, io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(err.kind(), SinkErrorKind::Fault);
    }

    #[test]
    fn channel_errors_expose_codes() {
        let err = channel_error(CONNECT, io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(err.code(), "pagewire.transport.tcp.connect_failed");
        assert!(err.to_string().starts_with("tcp connect failed"));

        let err = ChannelError::from(WriteError::Io {
            stage: FrameStage::Flush,
            source: map_io_error(FLUSH, io::Error::other("x")),
        });
        assert_eq!(err.code(), codes::WRITE_IO);
    }
}
