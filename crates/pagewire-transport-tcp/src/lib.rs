#![deny(unsafe_code)]
#![doc = r#"
# pagewire-transport-tcp

## 设计动机（Why）
- **定位**：在 Tokio 运行时上把页序列帧写到 TCP 连接或任意 `AsyncWrite`，
  作为同步写出器 [`PagesResponseWriter`](pagewire_core::PagesResponseWriter) 的异步对应物；
- **架构角色**：帧头的计算（页数校验、完整性字段）与失败策略全部复用
  `pagewire-core`，本 crate 只负责异步字节搬运与 IO 错误分类。

## 核心契约（What）
- [`write_frame_async`]：按 魔数 → 完整性字段 → 页数量 → 各页 → flush 的顺序写出一帧，
  从不关闭写端；
- [`TcpPagesChannel`]：单连接通道，`send_pages` 与 `shutdown` 可在多个任务间共享调用；
- [`TcpPagesListener`]：绑定并接受入站连接，产出 [`TcpPagesChannel`]；
- 对端断开（EOF、Broken pipe、连接重置等）折叠为
  [`WriteOutcome::PeerClosed`](pagewire_core::WriteOutcome::PeerClosed)，不返回错误、不记录日志；
  其余故障以 [`ChannelError`] 上抛并携带稳定错误码。

## 实现策略（How）
- 整数字段使用 `AsyncWriteExt::write_u32/write_u64`，天然为大端序；
- 通道内部以 `tokio::sync::Mutex` 序列化写出，保证同一连接上的帧不会交错。

## 风险与考量（Trade-offs）
- 不施加超时：对端缓慢时写出会一直等待，超时策略留给宿主通过 `tokio::time::timeout` 组合；
- 互斥锁意味着同一连接上的帧严格串行，需要并行时应使用多条连接。
"#]

mod channel;
mod error;
mod listener;

pub use channel::{TcpPagesChannel, write_frame_async};
pub use error::ChannelError;
pub use listener::TcpPagesListener;
