//! Wire protocol and shared types for the NUL-terminated TLS echo server.

#[cfg(feature = "cert")]
pub mod cert;
pub mod error;
pub mod prelude;
pub mod protocol;

pub use error::Error;

/// Port the server listens on when none is configured.
pub const DEFAULT_PORT: u16 = 6969;
