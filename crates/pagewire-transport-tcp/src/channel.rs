use std::{net::SocketAddr, sync::Arc};

use bytes::Bytes;
use pagewire_core::{
    FrameHeader, FrameStage, HEADER_LEN, PagesChecksum, PagesResponseWriter,
    SERIALIZED_PAGES_MAGIC, SinkError, WriteError, WriteOutcome,
};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::{TcpStream, ToSocketAddrs},
    sync::Mutex as AsyncMutex,
};

use crate::error::{self, ChannelError, channel_error, map_io_error};

/// 以异步方式把页序列写为一帧。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 异步宿主无法把 `AsyncWrite` 交给同步写出器；本函数沿用同一帧头计算与失败策略，
///   只把字节搬运换成 `.await`。
///
/// ## 逻辑 (How)
/// 1. 调用 [`PagesResponseWriter::header_for`] 得到帧头，页数溢出时立即返回且不写出任何字节；
/// 2. 依次写出魔数、完整性字段、页数量与各页；
/// 3. `flush` 写端但不关闭；
/// 4. 经 [`WriteOutcome::settle`] 把原始结果折叠为最终结局。
///
/// ## 契约 (What)
/// - 对端断开返回 `Ok(WriteOutcome::PeerClosed { .. })`；其余故障返回 [`WriteError::Io`]；
/// - 不重试，失败的帧整体视为未发送。
pub async fn write_frame_async<C, W>(
    writer: &PagesResponseWriter<C>,
    pages: &[Bytes],
    io: &mut W,
) -> Result<WriteOutcome, WriteError>
where
    C: PagesChecksum,
    W: AsyncWrite + Unpin + ?Sized,
{
    let header = writer.header_for(pages)?;
    WriteOutcome::settle(pages.len(), write_frame(&header, pages, io).await)
}

async fn write_frame<W>(
    header: &FrameHeader,
    pages: &[Bytes],
    io: &mut W,
) -> Result<u64, (FrameStage, SinkError)>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let at = |stage: FrameStage| move |err| (stage, map_io_error(error::WRITE, err));

    io.write_u32(SERIALIZED_PAGES_MAGIC)
        .await
        .map_err(at(FrameStage::Magic))?;
    io.write_u64(header.checksum())
        .await
        .map_err(at(FrameStage::Checksum))?;
    io.write_u32(header.page_count())
        .await
        .map_err(at(FrameStage::PageCount))?;

    let mut written = HEADER_LEN as u64;
    for (index, page) in pages.iter().enumerate() {
        io.write_all(page)
            .await
            .map_err(at(FrameStage::Page { index }))?;
        written += page.len() as u64;
    }

    io.flush()
        .await
        .map_err(|err| (FrameStage::Flush, map_io_error(error::FLUSH, err)))?;
    Ok(written)
}

#[derive(Debug)]
struct TcpPagesChannelInner {
    stream: AsyncMutex<TcpStream>,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
}

/// 发送页序列帧的 TCP 通道。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 交换链路的服务端在一条连接上依次推送多帧；通道把连接、地址元数据与写出串行化封装在一起。
///
/// ## 逻辑 (How)
/// - 内部以 `tokio::sync::Mutex` 包裹 `TcpStream`，克隆后的句柄共享同一连接；
/// - `send_pages` 在持锁期间完成整帧写出，保证帧与帧之间不交错。
///
/// ## 契约 (What)
/// - `connect` / `from_stream`：建立或接管连接；
/// - `send_pages`：写出一帧并 flush，不关闭连接；
/// - `shutdown`：关闭写半部，对端已断开时视为成功；
/// - `peer_addr` / `local_addr`：连接地址。
///
/// ## 注意事项 (Trade-offs)
/// - 不提供读路径：帧内没有页边界，解析需要页自身格式的知识，属于调用方职责。
#[derive(Clone, Debug)]
pub struct TcpPagesChannel {
    inner: Arc<TcpPagesChannelInner>,
}

impl TcpPagesChannel {
    pub(crate) fn from_parts(
        stream: TcpStream,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
    ) -> Self {
        Self {
            inner: Arc::new(TcpPagesChannelInner {
                stream: AsyncMutex::new(stream),
                peer_addr,
                local_addr,
            }),
        }
    }

    /// 建立到目标地址的连接。
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ChannelError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|err| channel_error(error::CONNECT, err))?;
        Self::from_stream(stream)
    }

    /// 接管一个已建立的连接。
    pub fn from_stream(stream: TcpStream) -> Result<Self, ChannelError> {
        let local = stream
            .local_addr()
            .map_err(|err| channel_error(error::CONNECT, err))?;
        let peer = stream
            .peer_addr()
            .map_err(|err| channel_error(error::CONNECT, err))?;
        Ok(Self::from_parts(stream, local, peer))
    }

    /// 写出一帧。
    ///
    /// 仅完整写出的帧以 `trace` 级别记录；对端断开时返回
    /// [`WriteOutcome::PeerClosed`] 且不产生任何事件。
    pub async fn send_pages<C>(
        &self,
        writer: &PagesResponseWriter<C>,
        pages: &[Bytes],
    ) -> Result<WriteOutcome, ChannelError>
    where
        C: PagesChecksum,
    {
        let mut guard = self.inner.stream.lock().await;
        let outcome = write_frame_async(writer, pages, &mut *guard).await?;
        // 对端断开不留任何日志。
        if let WriteOutcome::Completed { pages, bytes } = outcome {
            tracing::trace!(peer = %self.inner.peer_addr, pages, bytes, "pages frame sent");
        }
        Ok(outcome)
    }

    /// 关闭写半部，通知对端不会再有后续帧。
    pub async fn shutdown(&self) -> Result<(), ChannelError> {
        let mut guard = self.inner.stream.lock().await;
        match AsyncWriteExt::shutdown(&mut *guard).await {
            Ok(()) => Ok(()),
            Err(err) if pagewire_core::error::is_peer_closed(&err) => Ok(()),
            Err(err) => Err(channel_error(error::SHUTDOWN, err)),
        }
    }

    /// 对端地址。
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer_addr
    }

    /// 本地地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// 取回底层连接；仍存在其他克隆时返回原通道。
    pub fn try_into_stream(self) -> Result<TcpStream, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => Ok(inner.stream.into_inner()),
            Err(inner) => Err(Self { inner }),
        }
    }
}
