//! Parses a developer-typed line into a validated request (§4.2). The
//! controller only checks arity and digit classes locally — it never
//! reinterprets the grammar beyond that, since the debuggee is the
//! authority on everything else (field paths, scope letters, path
//! resolution). A line that passes here is forwarded to the wire
//! verbatim (trimmed): the debuggee tokenizes it again with the exact
//! same rule (`rdbg_core::tokenize`), so there is nothing to
//! reconstruct.

use rdbg_core::{tokenize, PROT_MAX_ARGS};

use crate::errors::ControllerError;

/// How many more lines/pairs the controller must read after `OK` before
/// the response is complete, and how to render them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `sb`/`db`: nothing follows the `OK` header at all.
    Empty,
    /// `ll`/`lu`/`lg`: `name\n<value>\n` pairs, blank-line terminated.
    NameValueList,
    /// `ps`: `short_src\nline\nname\nwhat\n` quadruples, blank-line
    /// terminated.
    Stack,
    /// `w`: a value line, a `hasMeta` flag, then a kind-specific tail —
    /// blank-line terminated.
    Watch,
    /// `lb`: `path\nline\n` pairs, blank-line terminated.
    Breakpoints,
}

/// A validated command, ready to forward to the debuggee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The exact bytes to send as the wire command line (sans the
    /// terminating `NUL`, which [`rdbg_core::wire::FrameWriter::write_command`]
    /// appends).
    pub wire_line: String,
    /// Whether this is one of `s`/`o`/`r`: no reply follows, only the
    /// next `BR`.
    pub is_resume: bool,
    /// What shape of response to expect, if not a resume command.
    pub response: ResponseShape,
}

/// Parse one line of user input. Never forwards anything to the wire
/// when this returns `Err`.
pub fn parse(line: &str) -> Result<ParsedCommand, ControllerError> {
    let trimmed = line.trim();
    let tokens = tokenize(trimmed, PROT_MAX_ARGS).map_err(|_| ControllerError::InvalidInput)?;
    let head = tokens.first().ok_or(ControllerError::InvalidInput)?;

    let (is_resume, response) = match head.as_str() {
        "s" | "o" | "r" => validate_arity(&tokens, 1).map(|()| (true, ResponseShape::Empty))?,
        "ll" | "lu" | "lg" => validate_level_args(&tokens).map(|()| (false, ResponseShape::NameValueList))?,
        "ps" => validate_arity(&tokens, 1).map(|()| (false, ResponseShape::Stack))?,
        "w" => validate_watch_args(&tokens).map(|()| (false, ResponseShape::Watch))?,
        "sb" | "db" => validate_breakpoint_args(&tokens).map(|()| (false, ResponseShape::Empty))?,
        "lb" => validate_arity(&tokens, 1).map(|()| (false, ResponseShape::Breakpoints))?,
        "h" => return Err(ControllerError::InvalidInput), // local-only, handled by the caller before parse() is reached
        _ => return Err(ControllerError::InvalidInput),
    };

    Ok(ParsedCommand {
        wire_line: trimmed.to_string(),
        is_resume,
        response,
    })
}

fn validate_arity(tokens: &[String], expected: usize) -> Result<(), ControllerError> {
    if tokens.len() == expected {
        Ok(())
    } else {
        Err(ControllerError::InvalidInput)
    }
}

fn validate_level_args(tokens: &[String]) -> Result<(), ControllerError> {
    match tokens.len() {
        1 => Ok(()),
        2 => tokens[1]
            .parse::<u32>()
            .map(|_| ())
            .map_err(|_| ControllerError::InvalidInput),
        _ => Err(ControllerError::InvalidInput),
    }
}

fn validate_breakpoint_args(tokens: &[String]) -> Result<(), ControllerError> {
    match tokens {
        [_, _path, line] => line
            .parse::<u32>()
            .map(|_| ())
            .map_err(|_| ControllerError::InvalidInput),
        _ => Err(ControllerError::InvalidInput),
    }
}

fn validate_watch_args(tokens: &[String]) -> Result<(), ControllerError> {
    let args = &tokens[1..];
    if let Some(first) = args.first() {
        if first.parse::<u32>().is_ok() {
            // Addressed form: <N> <l|u|g> <name>[<fieldpath>] [r]
            return match args {
                [_level, scope, _name] => validate_scope(scope),
                [_level, scope, _name, flag] if flag == "r" => validate_scope(scope),
                _ => Err(ControllerError::InvalidInput),
            };
        }
    }
    // Cached form: [<fieldpath>] [r]. A lone arg is only valid as the `r`
    // flag or as a field path proper — a field path always starts with
    // `|` (original `Controller.c:387`), so a bare token like `w foo`
    // must be rejected here rather than reaching the wire only to be
    // rejected by the debuggee's `FieldPath::parse`.
    match args {
        [] => Ok(()),
        [single] if single == "r" || single.starts_with('|') => Ok(()),
        [path, flag] if flag == "r" && path.starts_with('|') => Ok(()),
        _ => Err(ControllerError::InvalidInput),
    }
}

fn validate_scope(scope: &str) -> Result<(), ControllerError> {
    match scope {
        "l" | "u" | "g" => Ok(()),
        _ => Err(ControllerError::InvalidInput),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_commands_take_no_arguments() {
        let cmd = parse("s").unwrap();
        assert!(cmd.is_resume);
        assert!(parse("s 1").is_err());
    }

    #[test]
    fn list_locals_defaults_level_and_validates_digits() {
        assert_eq!(parse("ll").unwrap().response, ResponseShape::NameValueList);
        assert_eq!(parse("ll 2").unwrap().response, ResponseShape::NameValueList);
        assert!(parse("ll abc").is_err());
    }

    #[test]
    fn set_breakpoint_requires_exactly_path_and_numeric_line() {
        assert!(parse("sb foo.lua 10").is_ok());
        assert!(parse("sb foo.lua").is_err());
        assert!(parse("sb foo.lua ten").is_err());
    }

    #[test]
    fn watch_addressed_form_requires_a_valid_scope_letter() {
        assert!(parse("w 1 l x").is_ok());
        assert!(parse("w 1 z x").is_err());
        assert!(parse("w 1 l x r").is_ok());
    }

    #[test]
    fn watch_cached_form_allows_bare_field_path_or_flag() {
        assert!(parse("w").is_ok());
        assert!(parse("w |m").is_ok());
        assert!(parse("w |m r").is_ok());
        assert!(parse("w r").is_ok());
    }

    #[test]
    fn watch_cached_form_rejects_a_field_path_missing_its_leading_pipe() {
        assert!(parse("w foo").is_err());
        assert!(parse("w foo r").is_err());
    }

    #[test]
    fn quoted_path_survives_into_the_wire_line() {
        let cmd = parse(r#"sb "a file.lua" 10"#).unwrap();
        assert_eq!(cmd.wire_line, r#"sb "a file.lua" 10"#);
    }

    #[test]
    fn unknown_head_is_invalid() {
        assert!(parse("zzz").is_err());
    }
}
