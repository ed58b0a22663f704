use clap::Parser;
use common::prelude::*;
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};

/// Reference client for the NUL-terminated echo server.
#[derive(Debug, Parser)]
#[command(name = "nul-echo-client", version, about)]
pub struct Args {
    /// Server address to connect to
    #[arg(long, default_value_t = SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))]
    pub server: SocketAddr,

    /// Name expected in the server certificate
    #[arg(long, default_value = "localhost")]
    pub server_name: String,

    /// PEM file with trusted CA certificates (verification is disabled if omitted)
    #[arg(long)]
    pub ca: Option<PathBuf>,

    /// Message to send, without terminator
    #[arg(long, short, default_value = "hi")]
    pub message: String,
}
