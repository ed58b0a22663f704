//! Reference client for the NUL-terminated echo server.
//!
//! Sends one message and prints the reply, without its terminator, to stdout.

use clap::Parser;
use client::{
    Error,
    args::Args,
    exchange, strip_terminator,
    tls::{build_tls_config, load_ca_file},
};
use miette::{Context, IntoDiagnostic};
use rustls::pki_types::ServerName;
use std::{
    io::{Write, stdout},
    sync::Arc,
};
use tokio_rustls::TlsConnector;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let roots = match &args.ca {
        Some(path) => Some(load_ca_file(path)?),
        None => {
            warn!("no CA file given, server certificate will not be verified");
            None
        }
    };

    let connector = TlsConnector::from(Arc::new(build_tls_config(roots)?));
    let server_name = ServerName::try_from(args.server_name.clone())
        .map_err(|e| Error::InvalidServerName(e.to_string()))?;

    info!(server = %args.server, message = %args.message, "sending");
    let reply = exchange(args.server, &server_name, &connector, args.message.as_bytes()).await?;
    info!(bytes = reply.len(), "reply received");

    let mut out = stdout();
    out.write_all(strip_terminator(&reply))
        .and_then(|()| writeln!(out))
        .into_diagnostic()
        .context("failed to write reply")?;

    Ok(())
}
