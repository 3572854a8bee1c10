use std::any::Any;
use std::fmt;

use bytes::Bytes;

use crate::checksum::{PagesChecksum, XxHash64Checksum};
use crate::config::ExchangeConfig;
use crate::error::{SinkError, WriteError};
use crate::frame::{FrameHeader, HEADER_LEN, NO_CHECKSUM, SERIALIZED_PAGES_MAGIC};
use crate::media::MediaType;
use crate::registry::{PayloadDescriptor, ResponseWriter};
use crate::sink::PageSink;

/// 帧写出的步骤，用于标注故障发生的位置。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameStage {
    /// 写出魔数。
    Magic,
    /// 写出完整性字段。
    Checksum,
    /// 写出页数量。
    PageCount,
    /// 写出第 `index` 页（从 0 开始）。
    Page {
        /// 页序号。
        index: usize,
    },
    /// 刷出输出端。
    Flush,
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Magic => f.write_str("magic"),
            Self::Checksum => f.write_str("checksum"),
            Self::PageCount => f.write_str("page count"),
            Self::Page { index } => write!(f, "page #{index}"),
            Self::Flush => f.write_str("flush"),
        }
    }
}

/// 一次写出的正常结局。
///
/// 对端中途断开属于客户端行为，以 [`WriteOutcome::PeerClosed`] 的形式返回而非错误。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 整帧写出并已刷出。
    Completed {
        /// 写出的页数。
        pages: usize,
        /// 写出的总字节数（含帧头）。
        bytes: u64,
    },
    /// 对端在 `stage` 步骤关闭了连接，整帧视为未发送。
    PeerClosed {
        /// 断开时所处的步骤。
        stage: FrameStage,
    },
}

impl WriteOutcome {
    /// 是否完整写出。
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// 是否因对端关闭而提前结束。
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, Self::PeerClosed { .. })
    }

    /// 把一次帧写出的原始结果归结为最终结局。
    ///
    /// # 契约说明（What）
    /// - `result` 为写出的总字节数，或失败步骤与输出端错误；
    /// - 对端关闭折叠为 [`WriteOutcome::PeerClosed`]，不记录日志；
    /// - 其余故障转为 [`WriteError::Io`]，并以 `debug` 级别记录错误码与步骤。
    ///
    /// 同步与异步写出路径共用这一规则，保证两者的失败策略一致。
    pub fn settle(
        pages: usize,
        result: Result<u64, (FrameStage, SinkError)>,
    ) -> Result<Self, WriteError> {
        match result {
            Ok(bytes) => Ok(Self::Completed { pages, bytes }),
            Err((stage, source)) if source.is_peer_closed() => Ok(Self::PeerClosed { stage }),
            Err((stage, source)) => {
                let err = WriteError::Io { stage, source };
                tracing::debug!(code = err.code(), %stage, error = %err, "pages frame write failed");
                Err(err)
            }
        }
    }
}

/// 页序列响应写出器。
///
/// # 教案式说明
///
/// ## 意图 (Why)
/// - 交换链路的下游节点以该帧格式拉取中间结果；写出器把上游已序列化的页原样拼接到输出流，
///   并在配置开启时附带覆盖整个页序列的校验和。
///
/// ## 逻辑 (How)
/// 1. 写出魔数 [`SERIALIZED_PAGES_MAGIC`]；
/// 2. 写出完整性字段：开关开启时调用校验协作方，否则写 [`NO_CHECKSUM`]；
/// 3. 写出页数量；
/// 4. 依序写出每页原始字节，不加长度前缀；
/// 5. 刷出输出端，但不关闭它。
///
/// ## 契约 (What)
/// - 完整性开关在构造时确定，此后只读，写出器可在线程间共享（`Send + Sync`）；
/// - 每次调用独占一个输出端；调用之间不保留任何状态；
/// - 对端关闭被折叠为 [`WriteOutcome::PeerClosed`]，既不返回错误也不记录日志；
///   其他故障以 [`WriteError::Io`] 上抛并标注失败步骤；
/// - 不重试，失败的帧整体视为未发送。
///
/// ## 注意事项 (Trade-offs)
/// - 帧总长度无法预先得知，[`size_hint`](Self::size_hint) 恒为 `None`，宿主需使用分块传输。
pub struct PagesResponseWriter<C = XxHash64Checksum> {
    integrity_verification: bool,
    checksum: C,
    media_type: MediaType,
}

impl PagesResponseWriter<XxHash64Checksum> {
    /// 依据配置构建使用默认 xxh64 校验的写出器。
    pub fn new(config: &ExchangeConfig) -> Self {
        Self::with_checksum(config.is_integrity_verification_enabled(), XxHash64Checksum)
    }

    /// 以显式开关构建使用默认 xxh64 校验的写出器。
    pub fn with_integrity_verification(enabled: bool) -> Self {
        Self::with_checksum(enabled, XxHash64Checksum)
    }
}

impl<C> PagesResponseWriter<C>
where
    C: PagesChecksum,
{
    /// 以显式开关与自定义校验协作方构建写出器。
    pub fn with_checksum(integrity_verification: bool, checksum: C) -> Self {
        tracing::debug!(
            integrity_verification,
            media_type = crate::media::EXCHANGE_PAGES,
            "pages response writer constructed"
        );
        Self {
            integrity_verification,
            checksum,
            media_type: MediaType::exchange_pages(),
        }
    }

    /// 是否计算校验和。
    pub fn is_integrity_verification_enabled(&self) -> bool {
        self.integrity_verification
    }

    /// 写出器产出的媒体类型。
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// 帧总长度不可预知。
    pub fn size_hint(&self) -> Option<u64> {
        None
    }

    /// 判断负载与请求媒体类型是否可以由本写出器处理。
    ///
    /// 纯函数：不产生 IO，否定结果以 `false` 表达而不是错误。
    pub fn is_eligible(&self, payload: &PayloadDescriptor, requested: Option<&MediaType>) -> bool {
        payload.is_page_sequence()
            && requested.is_some_and(|media| media.is_compatible(&self.media_type))
    }

    /// 计算页序列对应的帧头。
    ///
    /// 页数量超出 `u32` 时返回 [`WriteError::PageCountOverflow`]。
    pub fn header_for(&self, pages: &[Bytes]) -> Result<FrameHeader, WriteError> {
        let page_count = u32::try_from(pages.len())
            .map_err(|_| WriteError::PageCountOverflow { count: pages.len() })?;
        let checksum = if self.integrity_verification {
            self.checksum.checksum(pages)
        } else {
            NO_CHECKSUM
        };
        Ok(FrameHeader::new(checksum, page_count))
    }

    /// 将页序列写为一帧。
    pub fn write<S>(&self, pages: &[Bytes], sink: &mut S) -> Result<WriteOutcome, WriteError>
    where
        S: PageSink + ?Sized,
    {
        let header = self.header_for(pages)?;
        WriteOutcome::settle(pages.len(), write_frame(&header, pages, sink))
    }
}

fn write_frame<S>(
    header: &FrameHeader,
    pages: &[Bytes],
    sink: &mut S,
) -> Result<u64, (FrameStage, SinkError)>
where
    S: PageSink + ?Sized,
{
    sink.write_u32(SERIALIZED_PAGES_MAGIC)
        .map_err(|err| (FrameStage::Magic, err))?;
    sink.write_u64(header.checksum())
        .map_err(|err| (FrameStage::Checksum, err))?;
    sink.write_u32(header.page_count())
        .map_err(|err| (FrameStage::PageCount, err))?;

    let mut written = HEADER_LEN as u64;
    for (index, page) in pages.iter().enumerate() {
        sink.write_bytes(page)
            .map_err(|err| (FrameStage::Page { index }, err))?;
        written += page.len() as u64;
    }

    sink.flush().map_err(|err| (FrameStage::Flush, err))?;
    Ok(written)
}

impl<C> ResponseWriter for PagesResponseWriter<C>
where
    C: PagesChecksum + 'static,
{
    fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    fn is_eligible(&self, payload: &PayloadDescriptor, requested: Option<&MediaType>) -> bool {
        PagesResponseWriter::is_eligible(self, payload, requested)
    }

    fn size_hint(&self, _payload: &(dyn Any + Send + Sync)) -> Option<u64> {
        PagesResponseWriter::size_hint(self)
    }

    fn write_erased(
        &self,
        payload: &(dyn Any + Send + Sync),
        sink: &mut dyn PageSink,
    ) -> Result<WriteOutcome, WriteError> {
        match payload.downcast_ref::<Vec<Bytes>>() {
            Some(pages) => self.write(pages, sink),
            None => Err(WriteError::PayloadMismatch {
                expected: std::any::type_name::<Vec<Bytes>>(),
            }),
        }
    }
}

impl<C> fmt::Debug for PagesResponseWriter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagesResponseWriter")
            .field("integrity_verification", &self.integrity_verification)
            .field("media_type", &self.media_type)
            .finish()
    }
}
