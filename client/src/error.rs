//! Error types for the reference client.

use miette::Diagnostic;
use std::{io, net::SocketAddr, path::PathBuf};
use thiserror::Error;

/// Result type using the client's custom error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// TLS configuration failure.
    #[error(transparent)]
    #[diagnostic(code(client::tls_error))]
    TlsConfig(#[from] rustls::Error),

    #[error("Failed to connect to {addr}: {source}")]
    #[diagnostic(code(client::connect_error))]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("TLS handshake with {addr} failed: {source}")]
    #[diagnostic(code(client::handshake_error))]
    Handshake {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Sending the message or reading the reply failed.
    #[error("Exchange with {addr} failed: {source}")]
    #[diagnostic(code(client::exchange_error))]
    Exchange {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load CA certificates from {}: {reason}", path.display())]
    #[diagnostic(
        code(client::ca_error),
        help("Pass a PEM file containing at least one CERTIFICATE block")
    )]
    CaLoad { path: PathBuf, reason: String },

    #[error("Invalid server name: {0}")]
    #[diagnostic(code(client::server_name_error))]
    InvalidServerName(String),
}

impl Error {
    /// Create a CA loading error.
    #[inline]
    pub fn ca_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CaLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
