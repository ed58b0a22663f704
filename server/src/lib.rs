//! TLS server that accepts one client at a time, reads a single
//! NUL-terminated message and answers with a fixed reply.

pub mod args;
pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod server;
pub mod session;
pub mod tls;

#[cfg(test)]
mod test_util;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use server::{ServerLoop, run};
