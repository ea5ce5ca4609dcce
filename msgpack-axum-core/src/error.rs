//! Transcoding error types.
//!
//! - [`DecodeError`]: A request body is not a well-formed encoding
//! - [`EncodeError`]: A structured value could not be encoded
//! - [`ConfigError`]: Invalid configuration, raised before serving requests

/// Errors produced when decoding a binary payload.
///
/// Request-scoped and recoverable: the server maps it to a 400 response.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The bytes are truncated, corrupt, or carry a type the structured value
    /// model cannot represent (binary blobs, extension types, non-string keys).
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A complete value was decoded but bytes were left over.
    #[error("unexpected {0} trailing bytes after payload")]
    TrailingBytes(usize),
}

/// Error produced when encoding a structured value.
///
/// Never expected for values built from JSON; treated as a programming defect.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("failed to encode payload: {0}")]
pub struct EncodeError(pub String);

/// Configuration errors, surfaced once at startup.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The target mime-type is empty or whitespace.
    #[error("mime type must not be empty")]
    EmptyMimeType,

    /// The target mime-type cannot be used as a `Content-Type` header value.
    #[error("invalid mime type {mime_type:?}: {reason}")]
    InvalidMimeType { mime_type: String, reason: String },

    /// The target mime-type would also match the disguise marker, so an
    /// already rewritten request would be flagged again.
    #[error("mime type {mime_type:?} matches the disguise marker {marker:?}")]
    AmbiguousMimeType {
        mime_type: String,
        marker: &'static str,
    },

    /// The matcher pattern failed to compile.
    #[error("failed to compile matcher for {mime_type:?}: {reason}")]
    Matcher { mime_type: String, reason: String },
}
