use crate::config::{DEFAULT_BACKLOG, DEFAULT_CERTIFICATE, DEFAULT_PRIVATE_KEY};
use clap::Parser;
use common::DEFAULT_PORT;
use std::path::PathBuf;

/// TLS server answering one NUL-terminated message per connection.
#[derive(Debug, Parser)]
#[command(name = "nul-echo-server", version, about)]
pub struct Args {
    /// Port to listen on, on all interfaces.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// PEM certificate chain, leaf first.
    #[arg(long, default_value = DEFAULT_CERTIFICATE)]
    pub cert: PathBuf,

    /// PEM private key, plain or encrypted PKCS#8.
    #[arg(long, default_value = DEFAULT_PRIVATE_KEY)]
    pub key: PathBuf,

    /// Password of an encrypted private key.
    #[arg(
        long,
        env = "NUL_ECHO_KEY_PASSWORD",
        hide_env_values = true,
        default_value = ""
    )]
    pub key_password: String,

    /// Pending connections queued by the OS.
    #[arg(long, default_value_t = DEFAULT_BACKLOG, value_parser = clap::value_parser!(u32).range(1..))]
    pub backlog: u32,

    /// Seconds allowed for the handshake and for the exchange (unlimited if unset).
    #[arg(long, value_name = "SECS")]
    pub io_timeout: Option<u64>,

    /// Reject messages longer than this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_message_bytes: Option<usize>,

    /// Stop the server on the first failed connection.
    #[arg(long)]
    pub fail_fast: bool,

    /// Config file (TOML); replaces the other options except the password.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}
