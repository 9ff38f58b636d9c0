//! The abstract host-VM interface (§6.2).
//!
//! Everything in this module is a trait boundary: the debuggee core never
//! assumes anything about the embedding VM beyond what [`VmInterface`]
//! promises. A real embedding provides a concrete implementation that
//! talks to its own stack-walking and value-introspection primitives;
//! tests in this crate use a small in-memory fixture instead.

use rdbg_core::Value;

/// The three hook events the VM delivers. `Return` also covers a
/// tail-return: the state machine treats them identically (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// About to execute a new source line.
    Line,
    /// A function is being entered.
    Call,
    /// A function is leaving (ordinary or tail return).
    Return,
}

/// Static metadata about one activation record, as surfaced by
/// `lua_getinfo`-equivalent introspection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameInfo {
    /// The function's source description (`short_src`).
    pub short_src: String,
    /// The line currently executing in this frame.
    pub current_line: u32,
    /// The function's name, if the VM can recover one.
    pub name: Option<String>,
    /// What kind of function this is (`"Lua"`, `"C"`, `"main"`, ...).
    pub what: Option<String>,
    /// Line the function is defined on.
    pub line_defined: i64,
    /// Last line of the function's body.
    pub last_line_defined: i64,
}

/// The capabilities a host VM must provide for the debugger core to work.
/// 1-based `level` throughout: level 1 is the innermost (currently paused)
/// frame, mirroring the wire protocol's `N` argument.
pub trait VmInterface {
    /// Enable or disable the per-line/call/return hook. Used by the `RUN`
    /// hook-disable optimization (§4.1) and re-enabled on the next
    /// `STEP`/`OVER`.
    fn set_hook_enabled(&mut self, enabled: bool);

    /// Number of frames currently on the stack (1 = only the paused
    /// frame). Used to validate a `level` argument without walking it.
    fn stack_depth(&self) -> u32;

    /// Static info for the frame at `level`, or `None` if `level` is out
    /// of range.
    fn frame_info(&self, level: u32) -> Option<FrameInfo>;

    /// Local variables of the frame at `level`, in VM slot order (so that
    /// later entries are higher slot indices — callers resolving a name
    /// by last-wins should scan in this order and keep the last match).
    fn locals(&self, level: u32) -> Vec<(String, Value)>;

    /// Upvalues of the function active at `level`, in declaration order
    /// (first match wins on a name clash).
    fn upvalues(&self, level: u32) -> Vec<(String, Value)>;

    /// The full globals-like environment visible to the function active
    /// at `level`, as a sequence of key/value pairs in VM iteration order.
    fn globals(&self, level: u32) -> Vec<(Value, Value)>;

    /// The metatable of `value`, if it has one.
    fn metatable(&self, value: &Value) -> Option<Value>;

    /// Index `table` with `key`, Lua-`gettable` style. `None` covers both
    /// "not a table" and "key absent" — callers distinguish by checking
    /// `table.kind()` first when they need to.
    fn table_get(&self, table: &Value, key: &Value) -> Option<Value>;

    /// All key/value pairs of `table`, in VM iteration order. Used both to
    /// render a `WATCH` on a table and to scan for an identity-selector
    /// match.
    fn table_entries(&self, table: &Value) -> Vec<(Value, Value)>;

    /// Byte size of a userdata value, if `value` is one.
    fn userdata_size(&self, value: &Value) -> Option<usize>;

    /// Static info for a function value, if `value` is one.
    fn function_info(&self, value: &Value) -> Option<FrameInfo>;

    /// VM-defined status code for a thread/coroutine value, if `value` is
    /// one.
    fn thread_status(&self, value: &Value) -> Option<i32>;

    /// Register a callback the VM must invoke at teardown. Implementers
    /// that can express teardown as an ordinary destructor may leave this
    /// a no-op and rely on `Session`'s own `Drop` instead; VMs that manage
    /// lifetime through a registry slot (as the original embedding does)
    /// should actually call `hook` from their finalizer.
    fn on_teardown(&mut self, hook: Box<dyn FnOnce() + Send>);
}
