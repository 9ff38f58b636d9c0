/// A semantic error (§7): the frame was well-formed but the request was
/// bad. Always surfaced to the controller as `ER\n<message>\n`; never
/// fatal to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    /// Arity or digit-class failure the debuggee re-validated defensively
    /// (the controller is expected to have already rejected these
    /// locally; this path only matters for a non-conforming client).
    #[error("Invalid argument!")]
    InvalidArgument,
    /// `WATCH`'s root-resolution phase found nothing.
    #[error("Variable is not found!")]
    VariableNotFound,
    /// `WATCH`'s field-walk phase hit a metatable/key that does not
    /// exist.
    #[error("Field is not found!")]
    FieldNotFound,
    /// `sb`/`db`'s path argument did not canonicalize.
    #[error("Invalid path!")]
    InvalidPath,
    /// A command name the debuggee does not recognize.
    #[error("Unknown command!")]
    UnknownCommand,
}

impl SemanticError {
    /// The exact text sent after `ER\n`.
    pub fn wire_message(self) -> &'static str {
        match self {
            SemanticError::InvalidArgument => "Invalid argument!",
            SemanticError::VariableNotFound => "Variable is not found!",
            SemanticError::FieldNotFound => "Field is not found!",
            SemanticError::InvalidPath => "Invalid path!",
            SemanticError::UnknownCommand => "Unknown command!",
        }
    }
}
