use std::fmt;

/// Low-level errors common to both ends of the wire: everything that is
/// *not* a semantic `ER` reply (those are free text and never reach this
/// type — see §7 of the design notes: Transport/Protocol errors are fatal
/// to the session, Semantic errors are just a string).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A read or write returned zero bytes, or the underlying syscall
    /// failed. Transport errors are always fatal to the current session.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A frame was structurally malformed: wrong prefix, missing
    /// delimiter, or a number that did not parse.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A string payload was not valid UTF-8 where the protocol requires
    /// text (raw string *values* are hex-encoded and never hit this path).
    #[error("invalid utf-8 in frame")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

impl CoreError {
    /// Build a [`CoreError::Protocol`] from a `Display`-able reason.
    pub fn protocol(reason: impl fmt::Display) -> Self {
        CoreError::Protocol(reason.to_string())
    }
}
