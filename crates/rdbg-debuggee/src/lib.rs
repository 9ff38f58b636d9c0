//! rdbg-debuggee — embeds into a host process running scripting-VM code.
//! Hooks the VM's line/call/return events, dispatches a remote
//! controller's commands, and maintains the breakpoint index and
//! variable inspection engine (§1 PURPOSE & SCOPE).
//!
//! The crate has no opinion on which VM it is embedded in beyond
//! [`VmInterface`] (§6.2); a host wires its own hook callback to
//! [`handle_event`] and implements the trait against its own stack and
//! value introspection primitives.

#![deny(missing_docs)]

mod breakpoint;
mod commands;
mod errors;
mod hook;
mod inspect;
mod session;
mod vm;

pub use breakpoint::BreakpointIndex;
pub use errors::SemanticError;
pub use hook::HookOutcome;
pub use inspect::{StackFrame, WatchDetail};
pub use session::{ResumeMode, Session};
pub use vm::{FrameInfo, HookEvent, VmInterface};

use std::io::BufReader;
use std::net::TcpStream;

use rdbg_core::wire::{FrameReader, FrameWriter};
use rdbg_core::{CoreError, CoreResult, DEFAULT_HOST, DEFAULT_PORT};

/// Parse the `REMOTE_LDB` environment variable's shape (§6.1):
/// `<host>:<port>`, `<host>`, or `:<port>`; an empty string is treated
/// the same as an unset variable.
pub fn parse_remote_ldb(raw: &str) -> (String, u16) {
    if raw.is_empty() {
        return (DEFAULT_HOST.to_string(), DEFAULT_PORT);
    }
    match raw.split_once(':') {
        Some((host, port)) => {
            let host = if host.is_empty() {
                DEFAULT_HOST.to_string()
            } else {
                host.to_string()
            };
            let port = port.parse().unwrap_or(DEFAULT_PORT);
            (host, port)
        }
        None => (raw.to_string(), DEFAULT_PORT),
    }
}

/// Resolve the connection endpoint from `REMOTE_LDB`, falling back to the
/// documented defaults when it is unset.
pub fn endpoint_from_env() -> (String, u16) {
    match std::env::var("REMOTE_LDB") {
        Ok(raw) => parse_remote_ldb(&raw),
        Err(_) => (DEFAULT_HOST.to_string(), DEFAULT_PORT),
    }
}

/// Connect to the controller at `host:port` and build a fresh session
/// around the resulting socket.
pub fn connect(host: &str, port: u16) -> std::io::Result<Session> {
    let sock = TcpStream::connect((host, port))?;
    Ok(Session::new(sock))
}

/// Drive one VM hook event to completion: consult the state machine, and
/// if it decides to stop, run the request/response loop until a resume
/// command is received or the connection fails.
pub fn handle_event(
    session: &mut Session,
    vm: &mut dyn VmInterface,
    event: HookEvent,
) -> HookOutcome {
    hook::on_event(session, vm, event, prompt_loop)
}

fn prompt_loop(
    session: &mut Session,
    vm: &mut dyn VmInterface,
    path: &str,
    line: u32,
) -> HookOutcome {
    match try_prompt_loop(session, vm, path, line) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("controller socket failed ({e}); detaching silently");
            session.detach();
            vm.set_hook_enabled(false);
            HookOutcome::Detached
        }
    }
}

fn try_prompt_loop(
    session: &mut Session,
    vm: &mut dyn VmInterface,
    path: &str,
    line: u32,
) -> CoreResult<HookOutcome> {
    let base = session
        .socket()
        .ok_or_else(|| CoreError::protocol("session already detached"))?;
    let write_sock = base.try_clone()?;
    let read_sock = base.try_clone()?;
    let mut reader = FrameReader::new(BufReader::new(read_sock));
    let mut writer = FrameWriter::new(write_sock);

    writer.write_break(path, line);
    writer.flush()?;

    loop {
        let raw = reader.read_command()?;
        log::trace!("received command {raw:?}");
        let command = match commands::parse(&raw) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("rejecting {raw:?}: {e}");
                writer.write_error(e.wire_message());
                writer.flush()?;
                continue;
            }
        };

        if command.is_resume() {
            apply_resume(&command, session, vm);
            return Ok(HookOutcome::Resumed);
        }

        match commands::dispatch(&command, session, vm, path, &mut writer) {
            Ok(()) => {}
            Err(e) => {
                log::debug!("command {raw:?} failed: {e}");
                writer.write_error(e.wire_message());
            }
        }
        writer.flush()?;
    }
}

fn apply_resume(command: &commands::Command, session: &mut Session, vm: &mut dyn VmInterface) {
    let mode = match command {
        commands::Command::Step => ResumeMode::Step,
        commands::Command::Over => ResumeMode::Over,
        commands::Command::Run => ResumeMode::Run,
        _ => unreachable!("is_resume() guarantees Step/Over/Run"),
    };
    session.set_mode(mode);
    // RUN with no breakpoints may run at full speed (§4.1); any other
    // mode, or RUN with breakpoints installed, needs the hook live.
    let disable_hook = matches!(mode, ResumeMode::Run) && session.breakpoints().is_empty();
    log::trace!("resume mode={mode:?} hook_enabled={}", !disable_hook);
    vm.set_hook_enabled(!disable_hook);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_ldb_defaults_on_empty() {
        assert_eq!(parse_remote_ldb(""), (DEFAULT_HOST.to_string(), DEFAULT_PORT));
    }

    #[test]
    fn remote_ldb_host_only() {
        assert_eq!(
            parse_remote_ldb("example.invalid"),
            ("example.invalid".to_string(), DEFAULT_PORT)
        );
    }

    #[test]
    fn remote_ldb_port_only() {
        assert_eq!(parse_remote_ldb(":9000"), (DEFAULT_HOST.to_string(), 9000));
    }

    #[test]
    fn remote_ldb_host_and_port() {
        assert_eq!(parse_remote_ldb("10.0.0.1:9000"), ("10.0.0.1".to_string(), 9000));
    }
}
