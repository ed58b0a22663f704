use crate::{
    error::{Error, Result, SocketStage},
    session::RawConnection,
};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::{TcpListener, TcpSocket};
use tracing::info;

/// Listening socket handing out one raw connection at a time.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Listen on `port` on all IPv4 interfaces.
    pub fn create(port: u16, backlog: u32) -> Result<Self> {
        Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), backlog)
    }

    /// Create the socket, enable address reuse, bind it to `addr` and start
    /// listening. Must be called from within a tokio runtime.
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(Error::socket(SocketStage::Create))?;

        socket
            .set_reuseaddr(true)
            .map_err(Error::socket(SocketStage::SetOption))?;
        socket
            .bind(addr)
            .map_err(Error::socket(SocketStage::Bind))?;
        let inner = socket
            .listen(backlog)
            .map_err(Error::socket(SocketStage::Listen))?;

        info!(listen = %addr, backlog, "listening");
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner
            .local_addr()
            .map_err(Error::socket(SocketStage::Bind))
    }

    /// Wait for the next client.
    pub async fn accept(&self) -> Result<RawConnection> {
        let (stream, peer) = self.inner.accept().await.map_err(Error::Accept)?;
        info!(peer = %peer, "client connected");
        Ok(RawConnection::new(stream, peer))
    }
}
