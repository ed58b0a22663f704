use miette::{Diagnostic, NamedSource, SourceSpan};
use std::{io, net::SocketAddr, path::PathBuf};
use strum::Display;
use thiserror::Error;

/// Result type using the server's custom error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Step of listening socket setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SocketStage {
    #[strum(to_string = "create")]
    Create,
    #[strum(to_string = "configure")]
    SetOption,
    #[strum(to_string = "bind")]
    Bind,
    #[strum(to_string = "listen on")]
    Listen,
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// Listening socket could not be set up.
    #[error("Failed to {stage} socket: {source}")]
    #[diagnostic(code(server::socket_error))]
    Socket {
        stage: SocketStage,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load the certificate {}: {reason}", path.display())]
    #[diagnostic(code(server::certificate_load))]
    CertificateLoad { path: PathBuf, reason: String },

    #[error("Failed to load the private key {}: {reason}", path.display())]
    #[diagnostic(code(server::private_key_load))]
    PrivateKeyLoad { path: PathBuf, reason: String },

    #[error("Private key does not match the certificate")]
    #[diagnostic(
        code(server::key_cert_mismatch),
        help("check that the key file belongs to the first certificate in the chain")
    )]
    KeyCertMismatch,

    #[error(transparent)]
    #[diagnostic(code(server::rustls_error))]
    Tls(#[from] rustls::Error),

    #[error("Failed to accept connection: {0}")]
    #[diagnostic(code(server::accept_error))]
    Accept(#[source] io::Error),

    /// ClientHello could not be read into a TLS session.
    #[error("[{peer}] TLS accept error: {source}")]
    #[diagnostic(code(server::tls_bind_error))]
    TlsBind {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("[{peer}] TLS handshake error: {source}")]
    #[diagnostic(code(server::handshake_error))]
    Handshake {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("[{peer}] Failed to receive message: {source}")]
    #[diagnostic(code(server::read_error))]
    Read {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("[{peer}] Failed to send message: {source}")]
    #[diagnostic(code(server::write_error))]
    Write {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("[{peer}] Message exceeds {limit} bytes")]
    #[diagnostic(code(server::message_too_long))]
    MessageTooLong { peer: SocketAddr, limit: usize },

    #[error("[{peer}] Session is {state}, not established")]
    #[diagnostic(code(server::not_established))]
    NotEstablished {
        peer: SocketAddr,
        state: crate::session::SessionState,
    },

    #[error("[{peer}] Timed out during {phase}")]
    #[diagnostic(code(server::timeout))]
    Timeout { peer: SocketAddr, phase: &'static str },
}

impl Error {
    #[inline]
    pub fn certificate_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CertificateLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    #[inline]
    pub fn private_key_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::PrivateKeyLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    #[inline]
    pub fn socket(stage: SocketStage) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Socket { stage, source }
    }

    /// Whether the error concerns a single client connection rather than the
    /// server itself.
    #[must_use]
    pub const fn is_connection_scoped(&self) -> bool {
        matches!(
            self,
            Self::Accept(_)
                | Self::TlsBind { .. }
                | Self::Handshake { .. }
                | Self::Read { .. }
                | Self::Write { .. }
                | Self::MessageTooLong { .. }
                | Self::NotEstablished { .. }
                | Self::Timeout { .. }
        )
    }
}

/// Configuration file errors, rendered with the offending source span.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file {}", path.display())]
    #[diagnostic(code(server::config::read_error))]
    ReadError {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    #[error("Failed to parse TOML config")]
    #[diagnostic(code(server::config::toml_error))]
    TomlParseError {
        #[source_code]
        src: NamedSource<String>,
        #[label("{source}")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for '{field}'")]
    #[diagnostic(code(server::config::validation_error))]
    ValidationError {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: Option<SourceSpan>,
        field: String,
        #[help]
        message: String,
    },

    #[error("Config error: {0}")]
    #[diagnostic(code(server::config::invalid))]
    Invalid(String),
}

impl ConfigError {
    /// Create a config error that has no file location.
    #[inline]
    pub fn invalid(error: impl Into<String>) -> Self {
        Self::Invalid(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 4000))
    }

    #[test]
    fn connection_errors_are_scoped() {
        let eof = || io::Error::from(io::ErrorKind::UnexpectedEof);
        assert!(Error::Accept(eof()).is_connection_scoped());
        assert!(
            Error::Handshake {
                peer: peer(),
                source: eof()
            }
            .is_connection_scoped()
        );
        assert!(
            Error::Read {
                peer: peer(),
                source: eof()
            }
            .is_connection_scoped()
        );
        assert!(
            Error::Timeout {
                peer: peer(),
                phase: "handshake"
            }
            .is_connection_scoped()
        );
    }

    #[test]
    fn init_errors_are_not_scoped() {
        assert!(!Error::KeyCertMismatch.is_connection_scoped());
        assert!(!Error::certificate_load("cert.pem", "missing").is_connection_scoped());
        assert!(
            !Error::socket(SocketStage::Bind)(io::Error::from(io::ErrorKind::AddrInUse))
                .is_connection_scoped()
        );
    }

    #[test]
    fn socket_error_names_stage() {
        let err = Error::socket(SocketStage::SetOption)(io::Error::other("denied"));
        assert_eq!(err.to_string(), "Failed to configure socket: denied");
    }
}
