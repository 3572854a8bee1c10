//! 响应写出器的显式注册与选择。
//!
//! # 设计背景（Why）
//! - 宿主框架在运行期只知道“负载长什么样”与“客户端想要什么媒体类型”，需要在若干写出器中挑出
//!   能够处理的那一个；本模块以显式注册表承担这一职责，不依赖任何扫描或反射式发现；
//! - 写出器的静态入口（如 [`PagesResponseWriter::write`](crate::PagesResponseWriter::write)）
//!   在编译期保证元素类型；注册表面对的是类型擦除后的负载，因此在这条缝上以 `TypeId` 补做检查。
//!
//! # 契约说明（What）
//! - 选择是纯函数：不产生 IO，不修改状态，找不到写出器时返回 `None` 而非错误；
//! - 候选按注册顺序尝试，先注册者优先。

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::WriteError;
use crate::media::{AcceptList, MediaType};
use crate::sink::PageSink;
use crate::writer::WriteOutcome;

/// 负载的外层形态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadShape {
    /// 有序集合（列表、序列）。
    Sequence,
    /// 单个值。
    Single,
}

/// 类型擦除后的负载描述：外层形态 + 元素类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadDescriptor {
    shape: PayloadShape,
    element: TypeId,
    element_name: &'static str,
}

impl PayloadDescriptor {
    /// 元素类型为 `T` 的序列。
    pub fn sequence_of<T: 'static>() -> Self {
        Self {
            shape: PayloadShape::Sequence,
            element: TypeId::of::<T>(),
            element_name: std::any::type_name::<T>(),
        }
    }

    /// 类型为 `T` 的单值。
    pub fn single<T: 'static>() -> Self {
        Self {
            shape: PayloadShape::Single,
            element: TypeId::of::<T>(),
            element_name: std::any::type_name::<T>(),
        }
    }

    /// 页序列：`Bytes` 的序列。
    pub fn pages() -> Self {
        Self::sequence_of::<bytes::Bytes>()
    }

    /// 外层形态。
    pub fn shape(&self) -> PayloadShape {
        self.shape
    }

    /// 元素类型名，仅用于诊断。
    pub fn element_name(&self) -> &'static str {
        self.element_name
    }

    /// 元素类型是否恰为 `T`。
    pub fn element_is<T: 'static>(&self) -> bool {
        self.element == TypeId::of::<T>()
    }

    /// 是否为页序列（外层为序列且元素恰为 `Bytes`）。
    pub fn is_page_sequence(&self) -> bool {
        self.shape == PayloadShape::Sequence && self.element_is::<bytes::Bytes>()
    }
}

/// 对象安全的响应写出器契约。
///
/// # 教案式说明
///
/// ## 意图 (Why)
/// - 注册表以 trait 对象形式存放不同媒体类型的写出器，通过 `Any` 完成运行期类型还原。
///
/// ## 契约 (What)
/// - `is_eligible` 必须是纯谓词，不得产生 IO；
/// - `size_hint` 返回 `None` 表示长度不可预知，宿主需改用分块传输；
/// - `write_erased` 收到不支持的负载类型时返回 [`WriteError::PayloadMismatch`]，且不写出任何字节。
///
/// ## 注意事项 (Trade-offs)
/// - 运行期下转型有少量开销；热路径可直接使用写出器的泛型入口。
pub trait ResponseWriter: Send + Sync + 'static {
    /// 写出器产出的媒体类型。
    fn media_type(&self) -> &MediaType;

    /// 判断负载与请求媒体类型是否可由本写出器处理。
    fn is_eligible(&self, payload: &PayloadDescriptor, requested: Option<&MediaType>) -> bool;

    /// 预估写出长度。
    fn size_hint(&self, payload: &(dyn Any + Send + Sync)) -> Option<u64>;

    /// 类型擦除的写出入口。
    fn write_erased(
        &self,
        payload: &(dyn Any + Send + Sync),
        sink: &mut dyn PageSink,
    ) -> Result<WriteOutcome, WriteError>;
}

/// 一次协商的结果：最终媒体类型与选中的写出器。
#[derive(Clone)]
pub struct NegotiatedWriter {
    media_type: MediaType,
    writer: Arc<dyn ResponseWriter>,
}

impl NegotiatedWriter {
    /// 响应应声明的 `Content-Type`。
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// 选中的写出器。
    pub fn writer(&self) -> &Arc<dyn ResponseWriter> {
        &self.writer
    }

    /// 拆分为 (媒体类型, 写出器)。
    pub fn into_parts(self) -> (MediaType, Arc<dyn ResponseWriter>) {
        (self.media_type, self.writer)
    }
}

impl fmt::Debug for NegotiatedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NegotiatedWriter")
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// 显式注册的写出器集合。
///
/// # 教案式说明
/// - **逻辑 (How)**：`select` 按注册顺序返回第一个声明可处理的写出器；`negotiate` 依
///   [`AcceptList`] 的偏好顺序逐项调用 `select`；
/// - **契约 (What)**：注册表在启动期构建，之后只读，可包在 `Arc` 中跨线程共享；
/// - **风险 (Trade-offs)**：线性扫描适合少量写出器，写出器数量很大时应按媒体类型建立索引。
#[derive(Clone, Default)]
pub struct WriterRegistry {
    writers: Vec<Arc<dyn ResponseWriter>>,
}

impl WriterRegistry {
    /// 空注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加写出器。
    pub fn register<W>(&mut self, writer: W) -> &mut Self
    where
        W: ResponseWriter,
    {
        self.register_shared(Arc::new(writer))
    }

    /// 追加已共享的写出器。
    pub fn register_shared(&mut self, writer: Arc<dyn ResponseWriter>) -> &mut Self {
        tracing::trace!(
            media_type = %writer.media_type(),
            position = self.writers.len(),
            "response writer registered"
        );
        self.writers.push(writer);
        self
    }

    /// 已注册的写出器数量。
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    /// 是否未注册任何写出器。
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    /// 为负载与单一请求媒体类型选择写出器。
    pub fn select(
        &self,
        payload: &PayloadDescriptor,
        requested: Option<&MediaType>,
    ) -> Option<Arc<dyn ResponseWriter>> {
        let selected = self
            .writers
            .iter()
            .find(|writer| writer.is_eligible(payload, requested))
            .cloned();
        match &selected {
            Some(writer) => tracing::debug!(
                media_type = %writer.media_type(),
                element = payload.element_name(),
                "response writer selected"
            ),
            None => tracing::trace!(
                element = payload.element_name(),
                requested = ?requested.map(ToString::to_string),
                "no eligible response writer"
            ),
        }
        selected
    }

    /// 依客户端偏好协商写出器。
    ///
    /// 返回的媒体类型总是写出器自身声明的具体类型，而不是请求中的通配范围。
    pub fn negotiate(
        &self,
        payload: &PayloadDescriptor,
        accept: &AcceptList,
    ) -> Option<NegotiatedWriter> {
        accept.iter().find_map(|requested| {
            self.select(payload, Some(requested))
                .map(|writer| NegotiatedWriter {
                    media_type: writer.media_type().clone(),
                    writer,
                })
        })
    }
}

impl fmt::Debug for WriterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.writers.iter().map(|writer| writer.media_type()))
            .finish()
    }
}
