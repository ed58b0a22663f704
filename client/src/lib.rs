//! Reference client for the NUL-terminated echo server.
//!
//! Connects over TLS, sends one terminated message and reads the reply until
//! the server closes the connection.

pub mod args;
pub mod error;
pub mod tls;

pub use error::{Error, Result};

use common::protocol::{TERMINATOR, write_terminated};
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use tokio::{io::AsyncReadExt, net::TcpStream};
use tokio_rustls::{TlsConnector, client::TlsStream};
use tracing::debug;

/// Open a TCP connection to `server` and run the TLS handshake.
///
/// # Errors
/// Returns an error if the connection or the handshake fails.
pub async fn connect(
    server: SocketAddr,
    server_name: &ServerName<'static>,
    connector: &TlsConnector,
) -> Result<TlsStream<TcpStream>> {
    let stream = TcpStream::connect(server)
        .await
        .map_err(|source| Error::Connect {
            addr: server,
            source,
        })?;

    let stream = connector
        .connect(server_name.clone(), stream)
        .await
        .map_err(|source| Error::Handshake {
            addr: server,
            source,
        })?;

    let (_, conn) = stream.get_ref();
    debug!(
        server = %server,
        cipher = ?conn.negotiated_cipher_suite(),
        version = ?conn.protocol_version(),
        "TLS connection established"
    );

    Ok(stream)
}

/// Send `message` and return everything the server writes back, terminator
/// included.
///
/// # Errors
/// Returns an error if connecting, writing or reading fails.
pub async fn exchange(
    server: SocketAddr,
    server_name: &ServerName<'static>,
    connector: &TlsConnector,
    message: &[u8],
) -> Result<Vec<u8>> {
    let mut stream = connect(server, server_name, connector).await?;
    let exchange_error = |source| Error::Exchange {
        addr: server,
        source,
    };

    write_terminated(&mut stream, message)
        .await
        .map_err(exchange_error)?;

    let mut reply = Vec::new();
    stream
        .read_to_end(&mut reply)
        .await
        .map_err(exchange_error)?;

    Ok(reply)
}

/// The reply up to its first terminator.
#[must_use]
pub fn strip_terminator(reply: &[u8]) -> &[u8] {
    reply
        .iter()
        .position(|&b| b == TERMINATOR)
        .map_or(reply, |end| &reply[..end])
}
