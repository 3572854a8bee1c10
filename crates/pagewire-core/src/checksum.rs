//! 完整性校验协作方。
//!
//! 写出器只负责在开关开启时调用 [`PagesChecksum::checksum`] 并把结果原样写入帧头；
//! 算法与多页合并规则由实现方决定。

use bytes::Bytes;
use xxhash_rust::xxh64::Xxh64;

use crate::frame::NO_CHECKSUM;

/// 对整个页序列计算 64 位校验值。
///
/// # 契约说明（What）
/// - 输入是完整页序列，校验值覆盖全部页而非单页；
/// - 实现必须是纯函数：同一序列总是得到同一结果；
/// - 实现需 `Send + Sync`，写出器会在多个请求线程间共享它。
pub trait PagesChecksum: Send + Sync {
    /// 计算校验值。
    fn checksum(&self, pages: &[Bytes]) -> u64;
}

impl<F> PagesChecksum for F
where
    F: Fn(&[Bytes]) -> u64 + Send + Sync,
{
    fn checksum(&self, pages: &[Bytes]) -> u64 {
        self(pages)
    }
}

/// 默认校验实现：以种子 0 的 xxh64 流式覆盖所有页字节。
///
/// 结果若恰好等于 [`NO_CHECKSUM`] 则加一，确保保留值不会被误读为“未校验”。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XxHash64Checksum;

impl XxHash64Checksum {
    const SEED: u64 = 0;
}

impl PagesChecksum for XxHash64Checksum {
    fn checksum(&self, pages: &[Bytes]) -> u64 {
        let mut hasher = Xxh64::new(Self::SEED);
        for page in pages {
            hasher.update(page);
        }
        reserve_sentinel(hasher.digest())
    }
}

fn reserve_sentinel(value: u64) -> u64 {
    if value == NO_CHECKSUM {
        value.wrapping_add(1)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xxhash_rust::xxh64::xxh64;

    #[test]
    fn covers_the_sequence_as_one_unit() {
        let split = vec![Bytes::from_static(b"hello "), Bytes::from_static(b"world")];
        let joined = vec![Bytes::from_static(b"hello world")];
        let checksum = XxHash64Checksum;

        assert_eq!(checksum.checksum(&split), checksum.checksum(&joined));
        assert_eq!(checksum.checksum(&joined), xxh64(b"hello world", 0));
    }

    #[test]
    fn any_byte_change_alters_the_value() {
        let pristine = vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def")];
        let tampered = vec![Bytes::from_static(b"abc"), Bytes::from_static(b"deg")];
        assert_ne!(
            XxHash64Checksum.checksum(&pristine),
            XxHash64Checksum.checksum(&tampered)
        );
    }

    #[test]
    fn sentinel_is_never_produced() {
        assert_eq!(reserve_sentinel(NO_CHECKSUM), NO_CHECKSUM + 1);
        assert_eq!(reserve_sentinel(5), 5);
    }

    #[test]
    fn closures_act_as_collaborators() {
        let count_bytes = |pages: &[Bytes]| pages.iter().map(|p| p.len() as u64).sum::<u64>();
        let pages = vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cde")];
        assert_eq!(count_bytes.checksum(&pages), 5);
    }
}
