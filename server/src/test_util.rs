//! Certificates and clients shared by the unit tests.

use crate::{config::ServerConfig, tls::TlsContext, tls::TlsContextFactory};
use claims::assert_ok;
use common::{
    cert::{PemFiles, generate_test_certs},
    protocol::write_terminated,
};
use rustls::{RootCertStore, pki_types::ServerName};
use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, DuplexStream};
use tokio_rustls::{TlsConnector, client::TlsStream};

pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub type TestClient = TlsStream<DuplexStream>;

/// Fixed peer address for sessions running over in-memory pipes.
pub fn loopback_peer() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 40_000))
}

/// A fresh CA and `localhost` server certificate written to a temp dir.
pub struct Fixture {
    pub dir: TempDir,
    pub files: PemFiles,
    ca_pem: String,
    password: &'static str,
}

impl Fixture {
    pub fn plain() -> Self {
        Self::generate(None)
    }

    /// Key written encrypted with [`TEST_PASSWORD`].
    pub fn encrypted() -> Self {
        Self::generate(Some(TEST_PASSWORD))
    }

    fn generate(password: Option<&'static str>) -> Self {
        let (ca, server) = assert_ok!(generate_test_certs("localhost"));
        let dir = assert_ok!(tempfile::tempdir());
        let files = assert_ok!(server.write_pem_files(dir.path(), password));

        Self {
            dir,
            files,
            ca_pem: ca.cert_pem,
            password: password.unwrap_or(""),
        }
    }

    /// Configuration pointing at the fixture files, listening on any port.
    pub fn server_config(&self, password: &str) -> ServerConfig {
        ServerConfig::new(
            0,
            &self.files.certificate,
            &self.files.private_key,
            password,
        )
    }

    pub fn context(&self) -> TlsContext {
        assert_ok!(TlsContextFactory::new(&self.server_config(self.password)).build())
    }

    /// Connector trusting only this fixture's CA.
    pub fn connector(&self) -> TlsConnector {
        let mut roots = RootCertStore::empty();
        for cert in rustls_pemfile::certs(&mut self.ca_pem.as_bytes()) {
            assert_ok!(roots.add(assert_ok!(cert)));
        }

        let config = assert_ok!(client::tls::build_tls_config(Some(roots)));
        TlsConnector::from(Arc::new(config))
    }

    /// Run the client side of the handshake over `io`.
    pub async fn client_over<S>(&self, io: S) -> io::Result<TlsStream<S>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.connector().connect(localhost(), io).await
    }

    /// Send `message` to a running server and collect whatever it answers
    /// before closing. A reset after a rejected message yields the bytes
    /// read so far.
    pub async fn exchange(&self, addr: SocketAddr, message: &[u8]) -> client::Result<Vec<u8>> {
        let mut stream = client::connect(addr, &localhost(), &self.connector()).await?;
        write_terminated(&mut stream, message)
            .await
            .map_err(|source| client::Error::Exchange { addr, source })?;

        let mut reply = Vec::new();
        let _ = stream.read_to_end(&mut reply).await;
        Ok(reply)
    }
}

pub fn localhost() -> ServerName<'static> {
    assert_ok!(ServerName::try_from("localhost"))
}
