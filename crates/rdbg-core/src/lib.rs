//! rdbg-core — primitives shared between the debuggee and the controller.
//!
//! Provides:
//! - [`CanonicalPath`]: the canonical key of the breakpoint table.
//! - [`Value`] / [`ValueKind`] / [`Identity`] / [`Number`]: the protocol's
//!   tagged value union, with opaque identity for reference kinds.
//! - [`FieldPath`] / [`Selector`]: the field-path parser used by the `w`
//!   (WATCH) command.
//! - [`wire`]: the framed reader/writer for the line-oriented text
//!   protocol.
//!
//! This crate knows nothing about the host VM or the controller's shell;
//! it only encodes and decodes the bytes the two processes exchange.

#![deny(missing_docs)]

mod error;
mod field_path;
pub mod grammar;
mod path;
mod value;
pub mod wire;

pub use error::CoreError;
pub use field_path::{FieldPath, Selector};
pub use grammar::{tokenize, PROT_MAX_ARGS};
pub use path::CanonicalPath;
pub use value::{Identity, Number, Value, ValueKind, PROT_MAX_STR_LEN};

/// Common result alias for the core crate.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Default TCP port (see `REMOTE_LDB`).
pub const DEFAULT_PORT: u16 = 2679;

/// Default host when `REMOTE_LDB` does not specify one.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Convenience prelude for importing the crate's key types.
pub mod prelude {
    /// Re-exports useful for a quick import.
    pub use super::{
        tokenize, CanonicalPath, CoreError, CoreResult, FieldPath, Identity, Number, Selector,
        Value, ValueKind, DEFAULT_HOST, DEFAULT_PORT, PROT_MAX_ARGS, PROT_MAX_STR_LEN,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol() {
        assert_eq!(DEFAULT_PORT, 2679);
        assert_eq!(DEFAULT_HOST, "127.0.0.1");
    }
}
