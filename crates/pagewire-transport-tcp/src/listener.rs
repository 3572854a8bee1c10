use std::net::SocketAddr;

use tokio::net::{TcpListener, ToSocketAddrs};

use crate::{
    TcpPagesChannel,
    error::{self, ChannelError, channel_error},
};

/// 接受入站连接并产出 [`TcpPagesChannel`] 的监听器。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 交换链路的数据提供方以服务端身份监听，下游节点建连后拉取页序列帧。
///
/// ## 契约 (What)
/// - `bind`：绑定地址，端口 `0` 时由系统分配，实际地址经 [`local_addr`](Self::local_addr) 获得；
/// - `accept`：等待一个入站连接，返回携带本地/对端地址的通道；
/// - **错误语义**：绑定/接受失败时返回带稳定错误码的 [`ChannelError::Io`]。
#[derive(Debug)]
pub struct TcpPagesListener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl TcpPagesListener {
    /// 绑定到指定地址。
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| channel_error(error::BIND, err))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| channel_error(error::BIND, err))?;
        tracing::debug!(%local_addr, "pages listener bound");
        Ok(Self {
            inner: listener,
            local_addr,
        })
    }

    /// 实际绑定的地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 接受一个入站连接。
    pub async fn accept(&self) -> Result<(TcpPagesChannel, SocketAddr), ChannelError> {
        let (stream, remote) = self
            .inner
            .accept()
            .await
            .map_err(|err| channel_error(error::ACCEPT, err))?;
        let local = stream
            .local_addr()
            .map_err(|err| channel_error(error::ACCEPT, err))?;
        Ok((TcpPagesChannel::from_parts(stream, local, remote), remote))
    }
}
