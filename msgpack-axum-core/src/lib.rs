//! Core transcoding types for msgpack-axum.
//!
//! This crate holds the framework-independent pieces used by the server
//! integration (`msgpack-axum`) and by anything else that needs to speak the
//! same wire contract:
//!
//! ## Modules
//!
//! - [`mime`]: Case-insensitive substring matcher for a configured mime-type
//! - [`codec`]: Codec trait and the MessagePack implementation
//! - [`error`]: Decode, encode and configuration errors

mod codec;
mod error;
mod mime;

pub use codec::*;
pub use error::*;
pub use mime::*;
