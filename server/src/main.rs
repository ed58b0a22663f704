//! NUL-terminated echo server.
//!
//! Listens for TLS clients one at a time:
//! - Reads bytes up to a NUL terminator
//! - Replies with a fixed message and closes the connection

use clap::Parser;
use server::{
    args::Args,
    config::{load_from_cli, load_from_file},
    run,
};
use std::{env, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        rust_version = env!("RUSTC_VERSION"),
        os = env::consts::OS,
        arch = env::consts::ARCH,
        "server starting"
    );

    let args = Args::parse();

    let config = if let Some(config_path) = &args.config {
        info!(config_file = %config_path.display(), "loading config from file");
        load_from_file(config_path, &args)
    } else {
        info!("using CLI arguments");
        load_from_cli(&args)
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{:?}", miette::Report::new(e));
            return ExitCode::FAILURE;
        }
    };

    info!(
        port = config.port,
        certificate = %config.certificate.display(),
        private_key = %config.private_key.display(),
        backlog = config.backlog,
        "configuration loaded"
    );

    run(config).await
}
