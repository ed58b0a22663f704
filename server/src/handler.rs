use crate::{
    error::{Error, Result},
    session::TlsSession,
};
use common::protocol::RESPONSE;
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time::timeout,
};
use tracing::info;

/// Reads one terminated message from the client and answers with
/// [`RESPONSE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoProtocolHandler {
    io_timeout: Option<Duration>,
}

impl EchoProtocolHandler {
    /// Handler giving up on an exchange after `io_timeout`.
    #[must_use]
    pub const fn new(io_timeout: Option<Duration>) -> Self {
        Self { io_timeout }
    }

    /// Serve one exchange. The session is closed on every path, a timed out
    /// exchange included.
    pub async fn handle<S>(&self, mut session: TlsSession<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outcome = match self.io_timeout {
            Some(limit) => timeout(limit, Self::exchange(&mut session))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Timeout {
                        peer: session.peer(),
                        phase: "exchange",
                    })
                }),
            None => Self::exchange(&mut session).await,
        };

        session.close().await;
        outcome
    }

    async fn exchange<S>(session: &mut TlsSession<S>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let message = session.read_terminated().await?;
        info!(
            peer = %session.peer(),
            message = %String::from_utf8_lossy(&message),
            "received"
        );

        session.write_all(RESPONSE).await?;
        info!(
            peer = %session.peer(),
            bytes = RESPONSE.len(),
            "response sent"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        session::RawConnection,
        test_util::{Fixture, loopback_peer},
    };
    use claims::{assert_matches, assert_ok};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    /// Run the handler against a client that sends `request` and then reads
    /// until the server closes.
    async fn serve(request: &[u8]) -> (Result<()>, Vec<u8>) {
        let fixture = Fixture::plain();
        let context = fixture.context();
        let (client_io, server_io) = duplex(16 * 1024);

        let server = async {
            let session =
                TlsSession::handshake(RawConnection::new(server_io, loopback_peer()), &context)
                    .await?;
            EchoProtocolHandler::default().handle(session).await
        };

        let client = async {
            let mut stream = assert_ok!(fixture.client_over(client_io).await);
            assert_ok!(stream.write_all(request).await);
            assert_ok!(stream.flush().await);

            let mut reply = Vec::new();
            // The server may close before the whole request is consumed.
            let _ = stream.read_to_end(&mut reply).await;
            reply
        };

        tokio::join!(server, client)
    }

    #[tokio::test]
    async fn replies_with_fixed_response() {
        let (outcome, reply) = serve(b"hi\0").await;
        assert_ok!(outcome);
        assert_eq!(reply, RESPONSE);
        assert_eq!(reply.len(), "Yo client get the fuck off!".len() + 1);
    }

    #[tokio::test]
    async fn empty_message_still_answered() {
        let (outcome, reply) = serve(b"\0").await;
        assert_ok!(outcome);
        assert_eq!(reply, RESPONSE);
    }

    #[tokio::test]
    async fn bytes_after_terminator_are_ignored() {
        let (outcome, reply) = serve(b"first\0second\0").await;
        assert_ok!(outcome);
        assert_eq!(reply, RESPONSE);
    }

    #[tokio::test]
    async fn unterminated_message_gets_no_response() {
        let fixture = Fixture::plain();
        let context = fixture.context();
        let (client_io, server_io) = duplex(16 * 1024);

        let server = async {
            let session =
                TlsSession::handshake(RawConnection::new(server_io, loopback_peer()), &context)
                    .await?;
            EchoProtocolHandler::default().handle(session).await
        };

        let client = async {
            let mut stream = assert_ok!(fixture.client_over(client_io).await);
            assert_ok!(stream.write_all(b"no terminator").await);
            assert_ok!(stream.shutdown().await);

            let mut reply = Vec::new();
            let _ = stream.read_to_end(&mut reply).await;
            reply
        };

        let (outcome, reply) = tokio::join!(server, client);
        assert_matches!(outcome, Err(Error::Read { .. }));
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn silent_client_is_closed_cleanly_after_timeout() {
        let fixture = Fixture::plain();
        let context = fixture.context();
        let (client_io, server_io) = duplex(16 * 1024);
        let handler = EchoProtocolHandler::new(Some(Duration::from_millis(100)));

        let server = async {
            let session =
                TlsSession::handshake(RawConnection::new(server_io, loopback_peer()), &context)
                    .await?;
            handler.handle(session).await
        };

        let client = async {
            let mut stream = assert_ok!(fixture.client_over(client_io).await);
            let mut reply = Vec::new();
            // close_notify arrives, so the stream ends without an error.
            assert_ok!(stream.read_to_end(&mut reply).await);
            reply
        };

        let (outcome, reply) = tokio::join!(server, client);
        assert_matches!(
            outcome,
            Err(Error::Timeout {
                phase: "exchange",
                ..
            })
        );
        assert!(reply.is_empty());
    }
}
