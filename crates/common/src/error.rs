//! Shared error types.

use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the shared encoding utilities.
///
/// Encoding a well-formed in-memory value cannot fail in practice; the
/// [`Base64`](Error::Base64) and [`Xdr`](Error::Xdr) variants surface
/// corruption when decoding values that came back from the backing store.
#[derive(Error, Debug)]
pub enum Error {
    /// XDR encoding/decoding error.
    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}
