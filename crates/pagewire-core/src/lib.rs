#![deny(unsafe_code)]
#![warn(missing_docs)]
#![doc = "pagewire-core: 交换链路页序列响应帧的编码、完整性校验与内容协商。"]
#![doc = ""]
#![doc = "== 帧格式 (Wire Contract) =="]
#![doc = "所有整数字段均以大端序（最高有效字节在前）写出："]
#![doc = "`magic(4) = 0xFEA4F001` | `checksum(8)` | `page_count(4)` | `pages(...)`。"]
#![doc = "页与页之间没有长度前缀，读取方需要从页自身的序列化格式得知每页长度。"]
#![doc = ""]
#![doc = "== 组件 =="]
#![doc = "- [`PagesResponseWriter`]：写出帧头与页字节，区分对端断开与真实故障；"]
#![doc = "- [`WriterRegistry`]：按 (媒体类型, 负载形态) 选择响应写出器；"]
#![doc = "- [`ExchangeConfig`]：在构造期决定是否开启完整性校验。"]

pub mod checksum;
pub mod config;
pub mod error;
pub mod frame;
pub mod media;
pub mod registry;
pub mod sink;
mod writer;

pub use checksum::{PagesChecksum, XxHash64Checksum};
pub use config::{DataIntegrityVerification, ExchangeConfig};
pub use error::{ConfigError, FrameError, SinkError, SinkErrorKind, WriteError, codes};
pub use frame::{FrameHeader, HEADER_LEN, NO_CHECKSUM, SERIALIZED_PAGES_MAGIC};
pub use media::{AcceptList, EXCHANGE_PAGES, MediaType};
pub use registry::{
    NegotiatedWriter, PayloadDescriptor, PayloadShape, ResponseWriter, WriterRegistry,
};
pub use sink::{IoSink, PageSink, classify_result};
pub use writer::{FrameStage, PagesResponseWriter, WriteOutcome};
