mod utils;

use crate::{
    args::Args,
    config::utils::validate_config,
    error::{self, ConfigError},
};
use common::DEFAULT_PORT;
use miette::{NamedSource, SourceSpan};
use serde::Deserialize;
use std::{
    fmt,
    fs::read_to_string,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CERTIFICATE: &str = "./keys/certificate.pem";
pub const DEFAULT_PRIVATE_KEY: &str = "./keys/certificate.key";
pub const DEFAULT_BACKLOG: u32 = 100;

/// Runtime configuration of the server. Immutable once built.
#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub certificate: PathBuf,
    pub private_key: PathBuf,
    pub private_key_password: String,
    /// Pending connections queued by the OS before `accept`.
    pub backlog: u32,
    /// Upper bound for the handshake and for the exchange of one connection.
    pub io_timeout: Option<Duration>,
    pub max_message_bytes: Option<usize>,
    /// Stop the server on the first failed connection instead of moving on.
    pub fail_fast: bool,
}

impl ServerConfig {
    #[must_use]
    pub fn new(
        port: u16,
        certificate: impl Into<PathBuf>,
        private_key: impl Into<PathBuf>,
        private_key_password: impl Into<String>,
    ) -> Self {
        Self {
            port,
            certificate: certificate.into(),
            private_key: private_key.into(),
            private_key_password: private_key_password.into(),
            backlog: DEFAULT_BACKLOG,
            io_timeout: None,
            max_message_bytes: None,
            fail_fast: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PORT, DEFAULT_CERTIFICATE, DEFAULT_PRIVATE_KEY, "")
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("certificate", &self.certificate)
            .field("private_key", &self.private_key)
            .field("private_key_password", &"<redacted>")
            .field("backlog", &self.backlog)
            .field("io_timeout", &self.io_timeout)
            .field("max_message_bytes", &self.max_message_bytes)
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

/// On-disk TOML representation of [`ServerConfig`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_certificate")]
    pub certificate: PathBuf,
    #[serde(default = "default_private_key")]
    pub private_key: PathBuf,
    pub private_key_password: Option<String>,
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    pub io_timeout_secs: Option<u64>,
    pub max_message_bytes: Option<usize>,
    #[serde(default)]
    pub fail_fast: bool,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_certificate() -> PathBuf {
    DEFAULT_CERTIFICATE.into()
}

fn default_private_key() -> PathBuf {
    DEFAULT_PRIVATE_KEY.into()
}

const fn default_backlog() -> u32 {
    DEFAULT_BACKLOG
}

impl FileConfig {
    /// Resolve into a [`ServerConfig`], taking the password from
    /// `fallback_password` when the file has none.
    #[must_use]
    pub fn into_server_config(self, fallback_password: &str) -> ServerConfig {
        ServerConfig {
            port: self.port,
            certificate: self.certificate,
            private_key: self.private_key,
            private_key_password: self
                .private_key_password
                .unwrap_or_else(|| fallback_password.to_owned()),
            backlog: self.backlog,
            io_timeout: self.io_timeout_secs.map(Duration::from_secs),
            max_message_bytes: self.max_message_bytes,
            fail_fast: self.fail_fast,
        }
    }
}

/// Load server configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_from_file(path: &Path, args: &Args) -> error::Result<ServerConfig> {
    let content = read_to_string(path).map_err(|source| ConfigError::ReadError {
        source,
        path: path.to_owned(),
    })?;

    let file_config = parse_config(&content, path)?;
    validate_config(&file_config, &content, path)?;

    Ok(file_config.into_server_config(&args.key_password))
}

fn parse_config(content: &str, path: &Path) -> error::Result<FileConfig> {
    toml::from_str::<FileConfig>(content).map_err(|source| {
        let span = source
            .span()
            .map(|s| SourceSpan::new(s.start.into(), s.end - s.start));

        ConfigError::TomlParseError {
            src: NamedSource::new(path.display().to_string(), content.to_owned()),
            span,
            source,
        }
        .into()
    })
}

/// Create server configuration from CLI arguments.
///
/// # Errors
/// Returns an error if a numeric limit is zero.
pub fn load_from_cli(args: &Args) -> error::Result<ServerConfig> {
    if args.io_timeout == Some(0) {
        return Err(ConfigError::invalid("--io-timeout must be greater than 0").into());
    }
    if args.max_message_bytes == Some(0) {
        return Err(ConfigError::invalid("--max-message-bytes must be greater than 0").into());
    }

    Ok(ServerConfig {
        port: args.port,
        certificate: args.cert.clone(),
        private_key: args.key.clone(),
        private_key_password: args.key_password.clone(),
        backlog: args.backlog,
        io_timeout: args.io_timeout.map(Duration::from_secs),
        max_message_bytes: args.max_message_bytes,
        fail_fast: args.fail_fast,
    })
}
