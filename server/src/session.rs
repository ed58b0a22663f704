use crate::{
    error::{Error, Result},
    tls::TlsContext,
};
use common::protocol::{LimitExceeded, read_terminated};
use rustls::server::Acceptor;
use std::{fmt, io, net::SocketAddr};
use strum::Display;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::{LazyConfigAcceptor, server::TlsStream};
use tracing::{debug, info};

/// Lifecycle of a [`TlsSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Created,
    Handshaking,
    Established,
    Closed,
    Failed,
}

/// An accepted client socket that has not started TLS yet.
#[derive(Debug)]
pub struct RawConnection<S = TcpStream> {
    pub stream: S,
    pub peer: SocketAddr,
}

impl<S> RawConnection<S> {
    pub const fn new(stream: S, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }
}

/// Encrypted channel bound to exactly one client connection.
pub struct TlsSession<S = TcpStream> {
    stream: TlsStream<S>,
    peer: SocketAddr,
    state: SessionState,
    max_message_bytes: Option<usize>,
}

impl<S> fmt::Debug for TlsSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSession")
            .field("peer", &self.peer)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S> TlsSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Run the server side of the TLS handshake over `connection`.
    ///
    /// Fails with [`Error::TlsBind`] when no ClientHello can be read from the
    /// connection and with [`Error::Handshake`] when the handshake itself
    /// fails.
    pub async fn handshake(connection: RawConnection<S>, context: &TlsContext) -> Result<Self> {
        let RawConnection { stream, peer } = connection;
        debug!(peer = %peer, state = %SessionState::Created, "binding connection");

        let acceptor = LazyConfigAcceptor::new(Acceptor::default(), stream);
        let start_handshake = acceptor
            .await
            .map_err(|source| Error::TlsBind { peer, source })?;

        debug!(peer = %peer, state = %SessionState::Handshaking, "client hello received");

        let stream = start_handshake
            .into_stream(context.config())
            .await
            .map_err(|source| Error::Handshake { peer, source })?;

        let (_, conn) = stream.get_ref();
        info!(
            peer = %peer,
            cipher = ?conn.negotiated_cipher_suite(),
            version = ?conn.protocol_version(),
            "TLS connection established"
        );

        Ok(Self {
            stream,
            peer,
            state: SessionState::Established,
            max_message_bytes: None,
        })
    }

    /// Reject messages longer than `limit` bytes.
    #[must_use]
    pub fn with_max_message_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_message_bytes = limit;
        self
    }

    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Read one message, up to but excluding the NUL terminator.
    ///
    /// The stream ending before the terminator is an error, and the partial
    /// message is discarded.
    pub async fn read_terminated(&mut self) -> Result<Vec<u8>> {
        self.ensure_established()?;

        match read_terminated(&mut self.stream, self.max_message_bytes).await {
            Ok(message) => Ok(message),
            Err(source) => {
                self.state = SessionState::Failed;
                Err(match limit_exceeded(&source) {
                    Some(limit) => Error::MessageTooLong {
                        peer: self.peer,
                        limit,
                    },
                    None => Error::Read {
                        peer: self.peer,
                        source,
                    },
                })
            }
        }
    }

    /// Write all of `bytes` and flush them to the peer.
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_established()?;

        if let Err(source) = write_flush(&mut self.stream, bytes).await {
            self.state = SessionState::Failed;
            return Err(Error::Write {
                peer: self.peer,
                source,
            });
        }

        Ok(())
    }

    /// Send `close_notify`, then release the TLS state and the socket.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "TLS shutdown failed");
        }

        let (socket, connection) = self.stream.into_inner();
        drop(connection);
        drop(socket);

        debug!(peer = %self.peer, state = %SessionState::Closed, "session closed");
    }

    fn ensure_established(&self) -> Result<()> {
        if self.state == SessionState::Established {
            Ok(())
        } else {
            Err(Error::NotEstablished {
                peer: self.peer,
                state: self.state,
            })
        }
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

fn limit_exceeded(error: &io::Error) -> Option<usize> {
    error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<LimitExceeded>())
        .map(|exceeded| exceeded.limit)
}
