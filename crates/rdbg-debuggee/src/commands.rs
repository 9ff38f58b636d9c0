//! Command parsing and dispatch for the debuggee's prompt loop (§4.2,
//! §4.3.2). Parsing turns one tokenized wire line into a [`Command`];
//! dispatch renders its response into a [`FrameWriter`]. Resume commands
//! (`s`/`o`/`r`) are the exception — per §4.1 they produce no reply at
//! all, only the next `BR`, so dispatch never sees them.

use std::io::Write;

use rdbg_core::wire::FrameWriter;
use rdbg_core::{CanonicalPath, FieldPath, Value};

use crate::errors::SemanticError;
use crate::inspect::{self, WatchDetail};
use crate::session::Session;
use crate::vm::VmInterface;

/// Which root a `WATCH` resolves against, before any field-path walk.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchRoot {
    /// Addressed form: a named variable at `level` in `scope`.
    Named {
        /// Stack level, 1 = innermost.
        level: u32,
        /// `l` (local), `u` (upvalue), or `g` (global).
        scope: char,
        /// The variable's name.
        name: String,
    },
    /// Cached form: the session's remembered value.
    Cached,
}

/// A fully parsed `WATCH` request.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchRequest {
    /// The resolution root.
    pub root: WatchRoot,
    /// The field path to walk from the root.
    pub path: FieldPath,
    /// Whether to cache the resolved value (trailing `r`).
    pub cache: bool,
}

/// One controller command (§4.2). `HELP` has no entry: it is local-only
/// and never reaches the wire; `MEMORY` and expression evaluation are not
/// modeled here at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `s`
    Step,
    /// `o`
    Over,
    /// `r`
    Run,
    /// `ll <N>`
    ListLocals(u32),
    /// `lu <N>`
    ListUpvalues(u32),
    /// `lg <N>`
    ListGlobals(u32),
    /// `ps`
    PrintStack,
    /// `w ...`
    Watch(WatchRequest),
    /// `sb <path> <line>`
    SetBreakpoint {
        /// Source path, or `.` for the currently-broken file.
        path: String,
        /// Line number.
        line: u32,
    },
    /// `db <path> <line>`
    DelBreakpoint {
        /// Source path, or `.` for the currently-broken file.
        path: String,
        /// Line number.
        line: u32,
    },
    /// `lb`
    ListBreakpoints,
}

impl Command {
    /// Whether this command ends the prompt loop and resumes the script.
    pub fn is_resume(&self) -> bool {
        matches!(self, Command::Step | Command::Over | Command::Run)
    }
}

/// Parse one command line, already stripped of its terminating `NUL`.
pub fn parse(line: &str) -> Result<Command, SemanticError> {
    let tokens = rdbg_core::tokenize(line, rdbg_core::PROT_MAX_ARGS)
        .map_err(|_| SemanticError::InvalidArgument)?;
    let Some(head) = tokens.first() else {
        return Err(SemanticError::UnknownCommand);
    };
    match head.as_str() {
        "s" => Ok(Command::Step),
        "o" => Ok(Command::Over),
        "r" => Ok(Command::Run),
        "ll" => Ok(Command::ListLocals(parse_level(tokens.get(1))?)),
        "lu" => Ok(Command::ListUpvalues(parse_level(tokens.get(1))?)),
        "lg" => Ok(Command::ListGlobals(parse_level(tokens.get(1))?)),
        "ps" => Ok(Command::PrintStack),
        "w" => parse_watch(&tokens[1..]).map(Command::Watch),
        "sb" => parse_breakpoint_args(&tokens[1..])
            .map(|(path, line)| Command::SetBreakpoint { path, line }),
        "db" => parse_breakpoint_args(&tokens[1..])
            .map(|(path, line)| Command::DelBreakpoint { path, line }),
        "lb" => Ok(Command::ListBreakpoints),
        _ => Err(SemanticError::UnknownCommand),
    }
}

fn parse_level(tok: Option<&String>) -> Result<u32, SemanticError> {
    match tok {
        None => Ok(1),
        Some(s) => s.parse::<u32>().map_err(|_| SemanticError::InvalidArgument),
    }
}

fn parse_breakpoint_args(args: &[String]) -> Result<(String, u32), SemanticError> {
    match args {
        [path, line] => {
            let line = line.parse::<u32>().map_err(|_| SemanticError::InvalidArgument)?;
            Ok((path.clone(), line))
        }
        _ => Err(SemanticError::InvalidArgument),
    }
}

/// Split a `name[<fieldpath>]` token at its first `|`, if any — the
/// leading name and any attached field-path tail are not whitespace
/// separated on the wire.
fn split_name_and_path(token: &str) -> (&str, &str) {
    match token.find('|') {
        Some(idx) => (&token[..idx], &token[idx..]),
        None => (token, ""),
    }
}

fn parse_watch(args: &[String]) -> Result<WatchRequest, SemanticError> {
    if let Some(first) = args.first() {
        if first.parse::<u32>().is_ok() {
            // Addressed form: <N> <l|u|g> <name>[<fieldpath>] [r]
            let [level_tok, scope_tok, name_tok, rest @ ..] = args else {
                return Err(SemanticError::InvalidArgument);
            };
            let level = level_tok.parse::<u32>().map_err(|_| SemanticError::InvalidArgument)?;
            let scope = single_char(scope_tok)?;
            if !matches!(scope, 'l' | 'u' | 'g') {
                return Err(SemanticError::InvalidArgument);
            }
            let (name, path_tail) = split_name_and_path(name_tok);
            let path = FieldPath::parse(path_tail).map_err(|_| SemanticError::InvalidArgument)?;
            let cache = match rest {
                [] => false,
                [flag] if flag == "r" => true,
                _ => return Err(SemanticError::InvalidArgument),
            };
            return Ok(WatchRequest {
                root: WatchRoot::Named {
                    level,
                    scope,
                    name: name.to_string(),
                },
                path,
                cache,
            });
        }
    }

    // Cached form: [<fieldpath>] [r]
    let (path_tok, cache) = match args {
        [] => (None, false),
        [only] if only == "r" => (None, true),
        [only] => (Some(only.as_str()), false),
        [p, flag] if flag == "r" => (Some(p.as_str()), true),
        _ => return Err(SemanticError::InvalidArgument),
    };
    let path = FieldPath::parse(path_tok.unwrap_or("")).map_err(|_| SemanticError::InvalidArgument)?;
    Ok(WatchRequest {
        root: WatchRoot::Cached,
        path,
        cache,
    })
}

fn single_char(tok: &str) -> Result<char, SemanticError> {
    let mut chars = tok.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(SemanticError::InvalidArgument),
    }
}

/// Render a `name\n<value>\n` listing, skipping VM-internal locals and
/// non-identifier global keys as their respective list functions already
/// do. Terminated by a blank line (§4.3): the listing has no known length
/// ahead of time, and neither a name nor an encoded value is ever empty.
fn write_listing<W: Write>(writer: &mut FrameWriter<W>, entries: Vec<(String, Value)>) {
    writer.begin_ok();
    for (name, value) in entries {
        writer.write_line(&name);
        writer.write_line(&value.encode());
    }
    writer.write_line("");
}

fn resolve_breakpoint_path(
    path_arg: &str,
    current_file: &str,
) -> Result<CanonicalPath, SemanticError> {
    let raw = if path_arg == "." { current_file } else { path_arg };
    CanonicalPath::canonicalize(raw).map_err(|_| SemanticError::InvalidPath)
}

fn render_watch<W: Write>(writer: &mut FrameWriter<W>, vm: &dyn VmInterface, value: &Value) {
    writer.begin_ok();
    writer.write_line(&value.encode());
    let (has_meta, detail) = inspect::watch_detail(vm, value);
    writer.write_line(if has_meta { "1" } else { "0" });
    match detail {
        WatchDetail::Table(entries) => {
            for (k, v) in entries {
                writer.write_line(&k.encode());
                writer.write_line(&v.encode());
            }
        }
        WatchDetail::UserData(size) => writer.write_line(&size.to_string()),
        WatchDetail::Function {
            what,
            short_src,
            line_defined,
            last_line_defined,
        } => {
            writer.write_line(&what);
            writer.write_line(&short_src);
            writer.write_line(&line_defined.to_string());
            writer.write_line(&last_line_defined.to_string());
        }
        WatchDetail::Thread(status) => writer.write_line(&status.to_string()),
        WatchDetail::None => {}
    }
    // Terminator (§4.3): the table tail has no known length ahead of time;
    // every other tail is fixed, but one blank line uniformly ends every
    // WATCH response so the controller never needs to special-case kinds.
    writer.write_line("");
}

/// Dispatch one non-resume command, buffering its response into `writer`.
/// The caller is responsible for flushing after dispatch returns, and for
/// writing an `ER` frame itself if this returns `Err`.
pub fn dispatch<W: Write>(
    command: &Command,
    session: &mut Session,
    vm: &dyn VmInterface,
    current_file: &str,
    writer: &mut FrameWriter<W>,
) -> Result<(), SemanticError> {
    match command {
        Command::Step | Command::Over | Command::Run => {
            unreachable!("resume commands never reach dispatch")
        }
        Command::ListLocals(level) => {
            write_listing(writer, inspect::list_locals(vm, *level));
            Ok(())
        }
        Command::ListUpvalues(level) => {
            write_listing(writer, inspect::list_upvalues(vm, *level));
            Ok(())
        }
        Command::ListGlobals(level) => {
            write_listing(writer, inspect::list_globals(vm, *level));
            Ok(())
        }
        Command::PrintStack => {
            writer.begin_ok();
            for frame in inspect::print_stack(vm) {
                writer.write_line(&frame.short_src);
                writer.write_line(&frame.current_line.to_string());
                writer.write_line(&frame.func_name);
                writer.write_line(&frame.what);
            }
            writer.write_line("");
            Ok(())
        }
        Command::Watch(request) => {
            let root = match &request.root {
                WatchRoot::Named { level, scope, name } => {
                    inspect::resolve_named_root(vm, *level, *scope, name)?
                }
                WatchRoot::Cached => session
                    .cache_value()
                    .cloned()
                    .ok_or(SemanticError::VariableNotFound)?,
            };
            let resolved = inspect::walk_field_path(vm, root, &request.path)?;
            render_watch(writer, vm, &resolved);
            if request.cache {
                session.set_cache_value(resolved);
            }
            Ok(())
        }
        Command::SetBreakpoint { path, line } => {
            let canonical = resolve_breakpoint_path(path, current_file)?;
            session.breakpoints_mut().insert(canonical, *line);
            writer.write_ok_empty();
            Ok(())
        }
        Command::DelBreakpoint { path, line } => {
            let canonical = resolve_breakpoint_path(path, current_file)?;
            session.breakpoints_mut().remove(&canonical, *line);
            writer.write_ok_empty();
            Ok(())
        }
        Command::ListBreakpoints => {
            writer.begin_ok();
            for (path, line) in session.breakpoints().list_sorted() {
                writer.write_line(path.as_str());
                writer.write_line(&line.to_string());
            }
            writer.write_line("");
            Ok(())
        }
    }
}
