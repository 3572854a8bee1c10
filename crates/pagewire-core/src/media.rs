//! 媒体类型与兼容性规则。
//!
//! # 设计背景（Why）
//! - 宿主框架依据请求的 `Accept` 与响应写出器声明的媒体类型完成内容协商；
//! - 页序列帧使用专属的二进制媒体类型 [`EXCHANGE_PAGES`]，与通用 `application/octet-stream` 区分。
//!
//! # 兼容规则（What）
//! - 比较忽略大小写与参数；
//! - 任一方为 `*/*`（或单独的 `*`）即兼容；
//! - 否则主类型必须相同，且任一方子类型为 `*` 或两者子类型相同。

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// 页序列帧的媒体类型。
pub const EXCHANGE_PAGES: &str = "application/x-exchange-pages";

const WILDCARD: &str = "*";

/// 已解析的媒体类型（不含参数）。
///
/// 主类型与子类型在构造时统一转为小写，因此派生的相等比较即为大小写无关比较。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaType {
    kind: Cow<'static, str>,
    subtype: Cow<'static, str>,
}

impl MediaType {
    /// 以主类型与子类型构建。
    pub fn new(kind: impl Into<Cow<'static, str>>, subtype: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: lowercase(kind.into()),
            subtype: lowercase(subtype.into()),
        }
    }

    /// `*/*`。
    pub fn wildcard() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    /// 页序列帧的媒体类型。
    pub fn exchange_pages() -> Self {
        Self::new("application", "x-exchange-pages")
    }

    /// 解析 `type/subtype[; params]`，参数被忽略。
    ///
    /// 单独的 `*` 视为 `*/*`；缺少 `/`、主类型或子类型为空时返回 `None`。
    pub fn parse(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence == WILDCARD {
            return Some(Self::wildcard());
        }
        let (kind, subtype) = essence.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }
        if kind == WILDCARD && subtype != WILDCARD {
            return None;
        }
        Some(Self::new(kind.to_owned(), subtype.to_owned()))
    }

    /// 主类型。
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// 子类型。
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// 主类型是否为通配符。
    pub fn is_wildcard_type(&self) -> bool {
        self.kind == WILDCARD
    }

    /// 子类型是否为通配符。
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD
    }

    /// 具体程度：`*/*` 为 0，`type/*` 为 1，具体类型为 2。
    pub fn specificity(&self) -> u8 {
        if self.is_wildcard_type() {
            0
        } else if self.is_wildcard_subtype() {
            1
        } else {
            2
        }
    }

    /// 判断两个媒体类型是否兼容，关系对称。
    pub fn is_compatible(&self, other: &MediaType) -> bool {
        if self.is_wildcard_type() || other.is_wildcard_type() {
            return true;
        }
        self.kind == other.kind
            && (self.is_wildcard_subtype()
                || other.is_wildcard_subtype()
                || self.subtype == other.subtype)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)
    }
}

/// [`MediaType::from_str`] 的失败结果。
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed media type `{0}`")]
pub struct ParseMediaTypeError(String);

impl FromStr for MediaType {
    type Err = ParseMediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseMediaTypeError(s.to_owned()))
    }
}

fn lowercase(value: Cow<'static, str>) -> Cow<'static, str> {
    if value.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(value.to_ascii_lowercase())
    } else {
        value
    }
}

/// 按偏好排序的 `Accept` 列表。
///
/// # 教案式说明
/// - **意图 (Why)**：客户端通常在 `Accept` 中列出多种可接受类型及其 `q` 权重，
///   注册中心需要按偏好依次尝试；
/// - **逻辑 (How)**：逐项解析媒体范围与 `q` 参数，忽略无法解析的项与 `q=0` 的项，
///   再按权重降序稳定排序；权重相同时更具体的范围在前（具体类型 > `type/*` > `*/*`），
///   权重与具体程度都相同时保持输入顺序；
/// - **契约 (What)**：空字符串或全部无效时得到空列表，由调用方决定是否回退到默认类型。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AcceptList {
    entries: Vec<(MediaType, f32)>,
}

impl AcceptList {
    /// 解析 `Accept` 头的取值。
    pub fn parse(header: &str) -> Self {
        let mut entries: Vec<(MediaType, f32)> = header
            .split(',')
            .filter_map(|item| {
                let media = MediaType::parse(item)?;
                let weight = quality(item);
                (weight > 0.0).then_some((media, weight))
            })
            .collect();
        entries.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| b.0.specificity().cmp(&a.0.specificity()))
        });
        Self { entries }
    }

    /// 仅包含单个媒体类型的列表。
    pub fn single(media: MediaType) -> Self {
        Self {
            entries: vec![(media, 1.0)],
        }
    }

    /// 按偏好顺序遍历媒体类型。
    pub fn iter(&self) -> impl Iterator<Item = &MediaType> {
        self.entries.iter().map(|(media, _)| media)
    }

    /// 某一媒体类型的权重；未出现时返回 `None`。
    pub fn weight_of(&self, media: &MediaType) -> Option<f32> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == media)
            .map(|(_, weight)| *weight)
    }

    /// 列表是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 列表长度。
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn quality(item: &str) -> f32 {
    item.split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
        .and_then(|(_, value)| value.trim().parse::<f32>().ok())
        .filter(|q| q.is_finite())
        .map(|q| q.clamp(0.0, 1.0))
        .unwrap_or(1.0)
}
