use crate::{
    config::ServerConfig,
    error::{Error, Result},
    handler::EchoProtocolHandler,
    listener::Listener,
    session::TlsSession,
    tls::{TlsContext, TlsContextFactory},
};
use std::{future::Future, net::SocketAddr, process::ExitCode, time::Duration};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Pause after a failed `accept` so a persistent failure such as running out
/// of descriptors does not spin the loop.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts clients one after another and serves each to completion.
#[derive(Debug)]
pub struct ServerLoop {
    config: ServerConfig,
    context: TlsContext,
    listener: Listener,
    handler: EchoProtocolHandler,
}

impl ServerLoop {
    /// Build the TLS context, then open the listening socket.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let context = TlsContextFactory::new(&config).build()?;
        let listener = Listener::create(config.port, config.backlog)?;
        Ok(Self::with_parts(config, context, listener))
    }

    #[must_use]
    pub fn with_parts(config: ServerConfig, context: TlsContext, listener: Listener) -> Self {
        let handler = EchoProtocolHandler::new(config.io_timeout);
        Self {
            config,
            context,
            listener,
            handler,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves or a fatal error occurs.
    ///
    /// A failed connection is logged and skipped unless `fail_fast` is set, in
    /// which case its error ends the loop. A connection still in flight when
    /// `shutdown` resolves is dropped.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested");
                    return Ok(());
                }
                result = self.serve_one() => {
                    if let Err(e) = result {
                        self.on_connection_error(e).await?;
                    }
                }
            }
        }
    }

    /// Accept, handshake and handle a single client.
    async fn serve_one(&self) -> Result<()> {
        let connection = self.listener.accept().await?;
        let peer = connection.peer;

        let session = self
            .bounded(peer, "handshake", TlsSession::handshake(connection, &self.context))
            .await?
            .with_max_message_bytes(self.config.max_message_bytes);

        self.handler.handle(session).await?;

        debug!(peer = %peer, "client disconnected");
        Ok(())
    }

    async fn bounded<T>(
        &self,
        peer: SocketAddr,
        phase: &'static str,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.config.io_timeout {
            Some(limit) => timeout(limit, future)
                .await
                .map_err(|_| Error::Timeout { peer, phase })?,
            None => future.await,
        }
    }

    async fn on_connection_error(&self, error: Error) -> Result<()> {
        if self.config.fail_fast || !error.is_connection_scoped() {
            return Err(error);
        }

        warn!(error = %error, "connection failed");
        if let Some(pause) = backoff_after(&error) {
            sleep(pause).await;
        }
        Ok(())
    }
}

/// Delay before the next `accept` following `error`.
const fn backoff_after(error: &Error) -> Option<Duration> {
    match error {
        Error::Accept(_) => Some(ACCEPT_BACKOFF),
        _ => None,
    }
}

/// Run the server until Ctrl-C or a fatal error.
pub async fn run(config: ServerConfig) -> ExitCode {
    let result = match ServerLoop::new(config) {
        Ok(server) => server.serve_until(shutdown_signal()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!("Closing server...");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:?}", miette::Report::new(e));
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
