//! The debuggee-side session record (§3): one per process, created when
//! the debuggee library loads and torn down by the VM's finalizer hook.

use std::net::TcpStream;

use rdbg_core::wire::FrameWriter;
use rdbg_core::Value;

use crate::breakpoint::BreakpointIndex;

/// The resume mode last selected by the controller, consulted on every
/// hook event (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    /// Single-step into the next line, even across calls.
    Step,
    /// Step over: stop at the next line at this frame or shallower.
    Over,
    /// Run until a breakpoint (or forever).
    Run,
    /// Reserved (§9): under-specified in the source this protocol is
    /// modeled on. Treated as equivalent to `Over` until a real stepping
    /// target level is introduced.
    Finish,
}

/// The debuggee's single, process-wide session state.
pub struct Session {
    /// The connection to the controller. `None` once the session has
    /// silently detached after an I/O error — the sentinel-disabled state
    /// of §3/§4.1.
    sock: Option<TcpStream>,
    /// Resume mode last selected by the controller.
    cmd: ResumeMode,
    /// Stack depth relative to the frame the last `OVER` was issued in.
    /// Never observed negative: increments on `Call`, saturates at zero
    /// on `Return`.
    level: i64,
    /// The breakpoint index.
    breakpoints: BreakpointIndex,
    /// The last value resolved by `WATCH ... r`, used as the implicit
    /// root when a later `w` omits the variable selector.
    cache_value: Option<Value>,
}

impl Session {
    /// Create a session around a freshly-connected socket.
    pub fn new(sock: TcpStream) -> Self {
        Self {
            sock: Some(sock),
            cmd: ResumeMode::Run,
            level: 0,
            breakpoints: BreakpointIndex::new(),
            cache_value: None,
        }
    }

    /// The socket, if the session is still attached.
    pub fn socket(&self) -> Option<&TcpStream> {
        self.sock.as_ref()
    }

    /// The socket, if the session is still attached, for I/O.
    pub fn socket_mut(&mut self) -> Option<&mut TcpStream> {
        self.sock.as_mut()
    }

    /// Whether the controller connection is still live.
    pub fn is_attached(&self) -> bool {
        self.sock.is_some()
    }

    /// Silently detach: invalidate the socket. The caller is responsible
    /// for also disabling the VM hook (§4.1) — this type has no VM handle
    /// of its own.
    pub fn detach(&mut self) {
        if self.sock.take().is_some() {
            log::warn!("session detached");
        }
    }

    /// Current resume mode.
    pub fn mode(&self) -> ResumeMode {
        self.cmd
    }

    /// Select a new resume mode. Does *not* touch `level` — the reset
    /// happens when a prompt is actually shown (§3), via
    /// [`Session::reset_level`], not when a mode is chosen.
    pub fn set_mode(&mut self, mode: ResumeMode) {
        self.cmd = mode;
    }

    /// Reset the depth counter to zero. Called exactly when a prompt is
    /// shown (§3), never on mode selection alone.
    pub fn reset_level(&mut self) {
        self.level = 0;
    }

    /// Current depth counter.
    pub fn level(&self) -> i64 {
        self.level
    }

    /// Increment on a `Call` event.
    pub fn enter_call(&mut self) {
        self.level += 1;
    }

    /// Decrement (saturating at zero) on a `Return`/tail-return event.
    pub fn leave_call(&mut self) {
        self.level = (self.level - 1).max(0);
    }

    /// The breakpoint index.
    pub fn breakpoints(&self) -> &BreakpointIndex {
        &self.breakpoints
    }

    /// Mutable access to the breakpoint index (`sb`/`db` handlers).
    pub fn breakpoints_mut(&mut self) -> &mut BreakpointIndex {
        &mut self.breakpoints
    }

    /// The cached watch value, if any.
    pub fn cache_value(&self) -> Option<&Value> {
        self.cache_value.as_ref()
    }

    /// Replace the cached watch value (the `w ... r` suffix).
    pub fn set_cache_value(&mut self, value: Value) {
        self.cache_value = Some(value);
    }
}

impl Drop for Session {
    /// The host VM's finalizer hook tears down the session by sending
    /// `QT` and closing the socket (§3). A VM that can invoke this
    /// deterministically should do so from its own finalizer via
    /// [`crate::vm::VmInterface::on_teardown`]; dropping the `Session`
    /// has the same effect either way, so this is the single place that
    /// implements it.
    fn drop(&mut self) {
        if let Some(sock) = self.sock.take() {
            log::trace!("session teardown: sending QT");
            let mut writer = FrameWriter::new(sock);
            writer.write_quit();
            let _ = writer.flush();
        }
    }
}
