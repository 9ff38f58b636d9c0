//! The variable inspection engine (§4.4): resolving a `WATCH` root and
//! walking a [`FieldPath`] against the dynamic value graph, plus the
//! locals/upvalues/globals/stack listings of §4.3.2.

use rdbg_core::{FieldPath, Identity, Number, Selector, Value, ValueKind};

use crate::errors::SemanticError;
use crate::vm::{FrameInfo, VmInterface};

/// One frame line of a `PRINT_STACK` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// `short-src`.
    pub short_src: String,
    /// Current line in that frame.
    pub current_line: u32,
    /// Function name, `"[N/A]"` if the VM reports none.
    pub func_name: String,
    /// Function kind (`what`), `"[N/A]"` if the VM reports none.
    pub what: String,
}

const NOT_AVAILABLE: &str = "[N/A]";

/// Locals of `level`, with VM-internal temporaries (names starting with
/// `(`) elided. A repeated name keeps its last value, matching the
/// last-slot-wins rule [`resolve_named_root`] applies for the addressed
/// form.
pub fn list_locals(vm: &dyn VmInterface, level: u32) -> Vec<(String, Value)> {
    let mut out: Vec<(String, Value)> = Vec::new();
    for (name, value) in vm.locals(level) {
        if name.starts_with('(') {
            continue;
        }
        if let Some(slot) = out.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            out.push((name, value));
        }
    }
    out
}

/// Upvalues of the function active at `level`. No filtering — every
/// named upvalue is listed.
pub fn list_upvalues(vm: &dyn VmInterface, level: u32) -> Vec<(String, Value)> {
    vm.upvalues(level)
}

/// Globals visible to the function active at `level`. Only string keys
/// that are syntactically valid identifiers are emitted.
pub fn list_globals(vm: &dyn VmInterface, level: u32) -> Vec<(String, Value)> {
    vm.globals(level)
        .into_iter()
        .filter_map(|(key, value)| match key {
            Value::String { bytes, .. } => {
                let name = String::from_utf8(bytes).ok()?;
                is_identifier(&name).then_some((name, value))
            }
            _ => None,
        })
        .collect()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// The full back-trace, innermost frame first.
pub fn print_stack(vm: &dyn VmInterface) -> Vec<StackFrame> {
    let mut frames = Vec::new();
    let mut level = 1;
    while let Some(FrameInfo {
        short_src,
        current_line,
        name,
        what,
        ..
    }) = vm.frame_info(level)
    {
        frames.push(StackFrame {
            short_src,
            current_line,
            func_name: name.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            what: what.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        });
        level += 1;
    }
    frames
}

/// Resolve the addressed form of `WATCH`'s root: `name` at `level` in
/// `scope`.
pub fn resolve_named_root(
    vm: &dyn VmInterface,
    level: u32,
    scope: char,
    name: &str,
) -> Result<Value, SemanticError> {
    if level < 1 || level > vm.stack_depth() {
        return Err(SemanticError::VariableNotFound);
    }
    match scope {
        'l' => {
            // Last (highest slot index) wins on a name clash.
            vm.locals(level)
                .into_iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or(SemanticError::VariableNotFound)
        }
        'u' => vm
            .upvalues(level)
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or(SemanticError::VariableNotFound),
        'g' => vm
            .globals(level)
            .into_iter()
            .find(|(k, _)| matches!(k, Value::String { bytes, .. } if bytes == name.as_bytes()))
            .map(|(_, v)| v)
            .ok_or(SemanticError::VariableNotFound),
        _ => Err(SemanticError::InvalidArgument),
    }
}

/// Walk a [`FieldPath`] starting from `root`, per §4.4.
pub fn walk_field_path(
    vm: &dyn VmInterface,
    root: Value,
    path: &FieldPath,
) -> Result<Value, SemanticError> {
    let mut current = root;
    for selector in path.selectors() {
        current = match selector {
            Selector::Meta => vm.metatable(&current).ok_or(SemanticError::FieldNotFound)?,
            Selector::Number(n) => {
                require_table(&current)?;
                vm.table_get(&current, &Value::Number(Number::Float(*n)))
                    .ok_or(SemanticError::FieldNotFound)?
            }
            Selector::Str(bytes) => {
                require_table(&current)?;
                let key = Value::string(Identity(0), bytes);
                vm.table_get(&current, &key)
                    .ok_or(SemanticError::FieldNotFound)?
            }
            Selector::Bool(b) => {
                require_table(&current)?;
                vm.table_get(&current, &Value::Boolean(*b))
                    .ok_or(SemanticError::FieldNotFound)?
            }
            Selector::LightUserData(addr) => {
                require_table(&current)?;
                vm.table_get(&current, &Value::LightUserData(*addr))
                    .ok_or(SemanticError::FieldNotFound)?
            }
            Selector::Identity { kind, addr } => {
                require_table(&current)?;
                // `addr` is whatever the controller was shown, i.e. the
                // wire-truncated 32-bit form (§4.3.1); a VM identity may be
                // a wider pointer, so compare on the transmitted width or a
                // VM with non-zero high bits would never match.
                let wire_addr = addr & 0xFFFF_FFFF;
                vm.table_entries(&current)
                    .into_iter()
                    .map(|(_, v)| v)
                    .find(|v| v.kind() == *kind && v.identity().map(|i| i.wire_value()) == Some(wire_addr))
                    .ok_or(SemanticError::FieldNotFound)?
            }
        };
    }
    Ok(current)
}

fn require_table(v: &Value) -> Result<(), SemanticError> {
    if v.kind().is_table_like() {
        Ok(())
    } else {
        Err(SemanticError::FieldNotFound)
    }
}

/// Everything `WATCH` needs to render after the value the field path
/// resolved to (§4.3.2): whether it has a metatable, plus kind-specific
/// detail.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchDetail {
    /// A table: its key/value pairs, in VM iteration order.
    Table(Vec<(Value, Value)>),
    /// A userdata: its byte size.
    UserData(usize),
    /// A function: `what`, `short_src`, `linedefined`, `lastlinedefined`.
    Function {
        /// Function kind.
        what: String,
        /// Source description.
        short_src: String,
        /// First line of the body.
        line_defined: i64,
        /// Last line of the body.
        last_line_defined: i64,
    },
    /// A thread: its status code.
    Thread(i32),
    /// Any other kind: nothing more to render.
    None,
}

/// Render the resolved value's detail section, and whether it has a
/// metatable.
pub fn watch_detail(vm: &dyn VmInterface, value: &Value) -> (bool, WatchDetail) {
    let has_meta = vm.metatable(value).is_some();
    let detail = match value.kind() {
        ValueKind::Table => WatchDetail::Table(vm.table_entries(value)),
        ValueKind::UserData => vm
            .userdata_size(value)
            .map(WatchDetail::UserData)
            .unwrap_or(WatchDetail::None),
        ValueKind::Function => vm
            .function_info(value)
            .map(|info| WatchDetail::Function {
                what: info.what.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                short_src: info.short_src,
                line_defined: info.line_defined,
                last_line_defined: info.last_line_defined,
            })
            .unwrap_or(WatchDetail::None),
        ValueKind::Thread => vm
            .thread_status(value)
            .map(WatchDetail::Thread)
            .unwrap_or(WatchDetail::None),
        _ => WatchDetail::None,
    };
    (has_meta, detail)
}
