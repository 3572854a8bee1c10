//! 输出端抽象。
//!
//! # 设计背景（Why）
//! - 写出器需要区分“对端关闭”与“其他故障”，因此输出端在自身边界上就把 IO 错误分类为
//!   [`SinkError`]，写出器不再检查被包裹的原因；
//! - 输出端的生命周期属于调用方：写出器只会 `flush`，从不关闭底层流。
//!
//! # 契约说明（What）
//! - 整数以大端序写出，这是帧线格式的一部分；
//! - 写出调用可以阻塞（对端慢或拥塞），本模块不施加超时。

use std::io::{self, BufWriter, Write};

use crate::error::SinkError;

/// [`IoSink`] 默认缓冲区大小。
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// 帧写出所需的最小输出能力。
///
/// 对象安全，宿主框架可以 `&mut dyn PageSink` 形式传入。
pub trait PageSink {
    /// 原样写出全部字节。
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SinkError>;

    /// 以大端序写出 32 位整数。
    fn write_u32(&mut self, value: u32) -> Result<(), SinkError> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// 以大端序写出 64 位整数。
    fn write_u64(&mut self, value: u64) -> Result<(), SinkError> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// 刷出缓冲数据，不关闭底层流。
    fn flush(&mut self) -> Result<(), SinkError>;
}

impl<S> PageSink for &mut S
where
    S: PageSink + ?Sized,
{
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        (**self).write_bytes(bytes)
    }

    fn write_u32(&mut self, value: u32) -> Result<(), SinkError> {
        (**self).write_u32(value)
    }

    fn write_u64(&mut self, value: u64) -> Result<(), SinkError> {
        (**self).write_u64(value)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

impl PageSink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// 把任意 [`std::io::Write`] 适配为 [`PageSink`] 的缓冲输出端。
///
/// # 教案式说明
/// - **意图 (Why)**：套接字与 HTTP 响应体通常只暴露 `Write`，本适配器补上缓冲与错误分类；
/// - **逻辑 (How)**：内部持有 `BufWriter`，每个 IO 错误都经 [`SinkError::classify`] 分类；
/// - **契约 (What)**：`flush` 只刷出缓冲区，底层 writer 在 [`IoSink::into_inner`] 后仍可继续使用；
/// - **风险 (Trade-offs)**：直接丢弃时 `BufWriter` 会在析构中再尝试刷出一次并忽略错误；
///   对端已关闭时这次写出对失效的套接字无害但多余，应改用 [`IoSink::discard`] 放弃剩余缓冲。
#[derive(Debug)]
pub struct IoSink<W: Write> {
    inner: BufWriter<W>,
}

impl<W: Write> IoSink<W> {
    /// 以默认缓冲区大小包装 writer。
    pub fn new(inner: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    /// 以指定缓冲区大小包装 writer。
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(capacity, inner),
        }
    }

    /// 底层 writer 的只读引用。
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// 刷出剩余缓冲并取回底层 writer。
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.inner
            .into_inner()
            .map_err(|err| SinkError::classify("flush", err.into_error()))
    }

    /// 丢弃尚未刷出的缓冲并取回底层 writer，不再触碰底层流。
    ///
    /// 帧以 [`WriteOutcome::PeerClosed`](crate::WriteOutcome::PeerClosed) 结束后，
    /// 连接已不可用，应通过本方法释放输出端，而不是直接丢弃。
    pub fn discard(self) -> W {
        let (inner, _unflushed) = self.inner.into_parts();
        inner
    }
}

impl<W: Write> PageSink for IoSink<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        classify_result("write", self.inner.write_all(bytes))
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        classify_result("flush", Write::flush(&mut self.inner))
    }
}

/// 将 `io::Result` 转为输出端结果的便捷函数，供自定义输出端复用分类规则。
pub fn classify_result<T>(operation: &'static str, result: io::Result<T>) -> Result<T, SinkError> {
    result.map_err(|err| SinkError::classify(operation, err))
}
