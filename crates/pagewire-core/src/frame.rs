//! 页序列帧的线格式常量与帧头编解码。
//!
//! # 线格式（What）
//!
//! | 偏移 | 长度 | 字段 | 取值 |
//! |---|---|---|---|
//! | 0 | 4 | magic | [`SERIALIZED_PAGES_MAGIC`] |
//! | 4 | 8 | checksum | 校验值或 [`NO_CHECKSUM`] |
//! | 12 | 4 | page count | N |
//! | 16 | 变长 | pages | N 个页依次拼接 |
//!
//! 所有整数字段以大端序写出。页之间没有长度前缀；[`split_pages`] 需要调用方从页自身格式
//! 得知每页长度。

use bytes::Bytes;

use crate::checksum::PagesChecksum;
use crate::error::FrameError;

/// 帧魔数。
pub const SERIALIZED_PAGES_MAGIC: u32 = 0xFEA4_F001;

/// “未计算校验和”的保留值。
///
/// 默认校验实现 [`XxHash64Checksum`](crate::XxHash64Checksum) 永远不会产出该值。
pub const NO_CHECKSUM: u64 = 0x0123_4567_89AB_CDEF;

/// 帧头长度：magic(4) + checksum(8) + page count(4)。
pub const HEADER_LEN: usize = 16;

/// 已解析的帧头。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    checksum: u64,
    page_count: u32,
}

impl FrameHeader {
    /// 构建帧头。
    pub const fn new(checksum: u64, page_count: u32) -> Self {
        Self {
            checksum,
            page_count,
        }
    }

    /// 构建不携带校验和的帧头。
    pub const fn unchecked(page_count: u32) -> Self {
        Self::new(NO_CHECKSUM, page_count)
    }

    /// 完整性字段。
    pub const fn checksum(&self) -> u64 {
        self.checksum
    }

    /// 帧声明的页数。
    pub const fn page_count(&self) -> u32 {
        self.page_count
    }

    /// 是否携带真实校验和。
    pub const fn has_checksum(&self) -> bool {
        self.checksum != NO_CHECKSUM
    }

    /// 编码为 16 字节帧头。
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&SERIALIZED_PAGES_MAGIC.to_be_bytes());
        out[4..12].copy_from_slice(&self.checksum.to_be_bytes());
        out[12..16].copy_from_slice(&self.page_count.to_be_bytes());
        out
    }

    /// 从字节切片开头解析帧头。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：`src` 至少包含 [`HEADER_LEN`] 字节，否则返回 [`FrameError::Truncated`]；
    /// - **后置条件**：仅检查魔数，不验证校验和；校验需调用 [`FrameHeader::verify`]。
    pub fn decode(src: &[u8]) -> Result<Self, FrameError> {
        if src.len() < HEADER_LEN {
            return Err(FrameError::Truncated {
                needed: HEADER_LEN,
                available: src.len(),
            });
        }
        let magic = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if magic != SERIALIZED_PAGES_MAGIC {
            return Err(FrameError::BadMagic { found: magic });
        }
        let mut checksum = [0u8; 8];
        checksum.copy_from_slice(&src[4..12]);
        let page_count = u32::from_be_bytes([src[12], src[13], src[14], src[15]]);
        Ok(Self {
            checksum: u64::from_be_bytes(checksum),
            page_count,
        })
    }

    /// 对收到的页重新计算校验和并与帧头比对。
    ///
    /// 帧头携带 [`NO_CHECKSUM`] 时跳过校验，与写出端关闭完整性校验的语义一致。
    pub fn verify<C>(&self, pages: &[Bytes], checksum: &C) -> Result<(), FrameError>
    where
        C: PagesChecksum + ?Sized,
    {
        if !self.has_checksum() {
            return Ok(());
        }
        let actual = checksum.checksum(pages);
        if actual != self.checksum {
            return Err(FrameError::ChecksumMismatch {
                expected: self.checksum,
                actual,
            });
        }
        Ok(())
    }
}

/// 解析整帧并按外部提供的页长度切出各页。
///
/// # 教案式说明
/// - **意图 (Why)**：帧内没有页边界，读取方必须从页的序列化格式获知长度；本函数把这一外部知识
///   作为参数，完成帧头校验与零拷贝切片；
/// - **契约 (What)**：`page_lengths` 的数量必须等于帧头页数，长度总和必须恰好等于帧头之后的字节数；
///   返回的 `Bytes` 与 `frame` 共享底层存储；
/// - **风险 (Trade-offs)**：不验证校验和，调用方应在拿到页后调用 [`FrameHeader::verify`]。
pub fn split_pages(
    frame: &Bytes,
    page_lengths: &[usize],
) -> Result<(FrameHeader, Vec<Bytes>), FrameError> {
    let header = FrameHeader::decode(frame)?;
    if header.page_count() as usize != page_lengths.len() {
        return Err(FrameError::PageCountMismatch {
            declared: header.page_count(),
            provided: page_lengths.len(),
        });
    }

    let mut offset = HEADER_LEN;
    let mut pages = Vec::with_capacity(page_lengths.len());
    for &len in page_lengths {
        let end = offset.checked_add(len).ok_or(FrameError::Truncated {
            needed: usize::MAX,
            available: frame.len(),
        })?;
        if end > frame.len() {
            return Err(FrameError::Truncated {
                needed: end,
                available: frame.len(),
            });
        }
        pages.push(frame.slice(offset..end));
        offset = end;
    }

    if offset != frame.len() {
        return Err(FrameError::TrailingBytes {
            extra: frame.len() - offset,
        });
    }
    Ok((header, pages))
}
