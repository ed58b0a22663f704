use miette::Diagnostic;
use thiserror::Error;

/// Result type using the `common`'s custom error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// File or network I/O error.
    #[error(transparent)]
    #[diagnostic(code(common::io_error))]
    Io(#[from] std::io::Error),

    #[cfg(feature = "cert")]
    #[error(transparent)]
    #[diagnostic(code(common::rcgen_error))]
    RCGen(#[from] rcgen::Error),

    /// PKCS#8 encoding or encryption failure.
    #[cfg(feature = "cert")]
    #[error("PKCS#8 error: {0}")]
    #[diagnostic(code(common::pkcs8_error))]
    Pkcs8(String),
}

impl Error {
    /// Create a PKCS#8 error.
    #[cfg(feature = "cert")]
    #[inline]
    pub fn pkcs8(error: impl ToString) -> Self {
        Self::Pkcs8(error.to_string())
    }
}
