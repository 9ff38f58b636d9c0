//! Controller-side error types (§7). A `Local` error never touches the
//! wire — it is the "Invalid command!" case of a malformed user line.
//! Everything else is [`rdbg_core::CoreError`]: a transport or protocol
//! failure, both fatal to the session.

use thiserror::Error;

/// Something the controller could not do.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The user's typed line did not parse (§7 "Local input"): never
    /// sent, the prompt just re-displays.
    #[error("Invalid command! Type 'h' for help.")]
    InvalidInput,

    /// The debuggee answered with `ER\n<message>`: a recoverable
    /// semantic error (§7); the session continues.
    #[error("{0}")]
    Semantic(String),

    /// Transport or protocol failure: fatal to the session.
    #[error(transparent)]
    Wire(#[from] rdbg_core::CoreError),
}
