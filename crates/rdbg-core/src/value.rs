use std::fmt;

use crate::{CoreError, CoreResult};

/// Values longer than this many bytes are truncated when rendered on the
/// wire; `rawLen` is still reported in full. Chosen generously relative to
/// a terminal-sized watch window — implementations embedding a different
/// VM MAY tune this, but both ends of one connection must agree.
pub const PROT_MAX_STR_LEN: usize = 512;

/// An opaque, pointer-sized identity for a reference-typed value.
///
/// Carries no meaning beyond equality: two values that compare equal by
/// identity are the same VM object. Rendered on the wire as `0x` followed
/// by 8 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(pub u64);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.wire_value())
    }
}

impl Identity {
    /// The low 32 bits actually put on the wire (§4.3.1: `0x` + 8 hex
    /// digits). A VM may hand back a wider pointer than this; any
    /// comparison against an identity parsed back off the wire — e.g. the
    /// `t|u|f|d<hex>` field-path selectors (§4.4) — must mask to this same
    /// width or it will never match a VM identity with non-zero high bits.
    pub const fn wire_value(&self) -> u64 {
        self.0 & 0xFFFF_FFFF
    }

    fn parse_hex(hex: &str) -> CoreResult<Self> {
        let hex = hex
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::protocol(format!("identity missing 0x prefix: {hex}")))?;
        let v = u64::from_str_radix(hex, 16)
            .map_err(|e| CoreError::protocol(format!("bad identity hex '{hex}': {e}")))?;
        Ok(Self(v))
    }
}

/// The VM value kinds the protocol distinguishes. Mirrors §3's tagged
/// union; every variant other than `Nil`/`Boolean`/`Number`/`String` is a
/// plain reference kind identified only by its [`Identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `l`
    Nil,
    /// `b`
    Boolean,
    /// `n`
    Number,
    /// `s`
    String,
    /// `t`
    Table,
    /// `f`
    Function,
    /// `u`
    UserData,
    /// `U`
    LightUserData,
    /// `d`
    Thread,
}

impl ValueKind {
    /// The wire tag letter for this kind.
    pub const fn tag(self) -> char {
        match self {
            ValueKind::Nil => 'l',
            ValueKind::Boolean => 'b',
            ValueKind::Number => 'n',
            ValueKind::String => 's',
            ValueKind::Table => 't',
            ValueKind::Function => 'f',
            ValueKind::UserData => 'u',
            ValueKind::LightUserData => 'U',
            ValueKind::Thread => 'd',
        }
    }

    /// Whether this kind carries a table-like environment that field-path
    /// selectors can walk into (metatables, typed keys, identity scan).
    pub const fn is_table_like(self) -> bool {
        matches!(self, ValueKind::Table)
    }
}

/// A number as the VM reports it: the wire format picks integer or
/// floating rendering at runtime, it does not carry a static type tag of
/// its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integral value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// A value as rendered on the wire: the tagged union of §3/§4.3.1.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `l` — nil.
    Nil,
    /// `b` — boolean.
    Boolean(bool),
    /// `n` — number (integer or float).
    Number(Number),
    /// `s` — string: identity of the string object, the true byte length,
    /// and the (possibly truncated) bytes actually carried.
    String {
        /// Identity of the string object (strings are reference values
        /// too; this is the `0x<hex>` prefix of the `s` payload).
        identity: Identity,
        /// True length of the string in bytes.
        raw_len: usize,
        /// The first `min(raw_len, PROT_MAX_STR_LEN)` bytes.
        bytes: Vec<u8>,
    },
    /// `t` — table, identified opaquely.
    Table(Identity),
    /// `f` — function, identified opaquely.
    Function(Identity),
    /// `u` — full userdata, identified opaquely.
    UserData(Identity),
    /// `U` — light userdata: a bare address, not a tracked VM object.
    LightUserData(u64),
    /// `d` — coroutine/thread, identified opaquely.
    Thread(Identity),
}

impl Value {
    /// Build a truncated string value from its full raw bytes.
    pub fn string(identity: Identity, raw: &[u8]) -> Self {
        let trunc = raw.len().min(PROT_MAX_STR_LEN);
        Value::String {
            identity,
            raw_len: raw.len(),
            bytes: raw[..trunc].to_vec(),
        }
    }

    /// The [`ValueKind`] of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String { .. } => ValueKind::String,
            Value::Table(_) => ValueKind::Table,
            Value::Function(_) => ValueKind::Function,
            Value::UserData(_) => ValueKind::UserData,
            Value::LightUserData(_) => ValueKind::LightUserData,
            Value::Thread(_) => ValueKind::Thread,
        }
    }

    /// The identity of this value, if it is a reference kind with one.
    /// Strings carry an identity too (used by the `s`-kind identity
    /// selector is not part of the protocol, but display needs it).
    pub const fn identity(&self) -> Option<Identity> {
        match self {
            Value::String { identity, .. }
            | Value::Table(identity)
            | Value::Function(identity)
            | Value::UserData(identity)
            | Value::Thread(identity) => Some(*identity),
            Value::LightUserData(_) | Value::Nil | Value::Boolean(_) | Value::Number(_) => None,
        }
    }

    /// Render this value as one wire line, *without* the trailing `\n`
    /// (the wire writer owns line termination).
    pub fn encode(&self) -> String {
        match self {
            Value::Nil => "l".to_string(),
            Value::Boolean(b) => format!("b{}", u8::from(*b)),
            Value::Number(n) => format!("n{n}"),
            Value::Table(id) => format!("t{id}"),
            Value::Function(id) => format!("f{id}"),
            Value::UserData(id) => format!("u{id}"),
            Value::Thread(id) => format!("d{id}"),
            Value::LightUserData(addr) => format!("U0x{:08x}", addr & 0xFFFF_FFFF),
            Value::String {
                identity,
                raw_len,
                bytes,
            } => {
                let trunc_len = bytes.len();
                let mut hex = String::with_capacity(trunc_len * 2);
                for b in bytes {
                    hex.push_str(&format!("{b:02x}"));
                }
                format!("s{identity}:{raw_len}:{trunc_len}:{hex}")
            }
        }
    }

    /// Parse one wire value line (sans trailing `\n`) back into a
    /// [`Value`]. The controller uses this to interpret `OK` payloads; it
    /// round-trips with [`Value::encode`] for every kind except strings
    /// longer than [`PROT_MAX_STR_LEN`], which are lossy by design.
    pub fn parse(line: &str) -> CoreResult<Self> {
        let mut chars = line.chars();
        let tag = chars
            .next()
            .ok_or_else(|| CoreError::protocol("empty value line"))?;
        let rest = chars.as_str();
        match tag {
            'l' => Ok(Value::Nil),
            'b' => match rest {
                "0" => Ok(Value::Boolean(false)),
                "1" => Ok(Value::Boolean(true)),
                other => Err(CoreError::protocol(format!("bad bool payload: {other}"))),
            },
            'n' => parse_number(rest).map(Value::Number),
            't' => Identity::parse_hex(rest).map(Value::Table),
            'f' => Identity::parse_hex(rest).map(Value::Function),
            'u' => Identity::parse_hex(rest).map(Value::UserData),
            'd' => Identity::parse_hex(rest).map(Value::Thread),
            'U' => {
                let hex = rest
                    .strip_prefix("0x")
                    .ok_or_else(|| CoreError::protocol("light userdata missing 0x prefix"))?;
                let addr = u64::from_str_radix(hex, 16)
                    .map_err(|e| CoreError::protocol(format!("bad address hex: {e}")))?;
                Ok(Value::LightUserData(addr))
            }
            's' => parse_string_payload(rest),
            other => Err(CoreError::protocol(format!("unknown value tag: {other}"))),
        }
    }
}

fn parse_number(rest: &str) -> CoreResult<Number> {
    if let Ok(i) = rest.parse::<i64>() {
        return Ok(Number::Int(i));
    }
    rest.parse::<f64>()
        .map(Number::Float)
        .map_err(|e| CoreError::protocol(format!("bad number payload '{rest}': {e}")))
}

fn parse_string_payload(rest: &str) -> CoreResult<Value> {
    let mut parts = rest.splitn(4, ':');
    let addr = parts
        .next()
        .ok_or_else(|| CoreError::protocol("string payload missing address"))?;
    let raw_len: usize = parts
        .next()
        .ok_or_else(|| CoreError::protocol("string payload missing rawLen"))?
        .parse()
        .map_err(|e| CoreError::protocol(format!("bad rawLen: {e}")))?;
    let trunc_len: usize = parts
        .next()
        .ok_or_else(|| CoreError::protocol("string payload missing truncLen"))?
        .parse()
        .map_err(|e| CoreError::protocol(format!("bad truncLen: {e}")))?;
    let hex = parts
        .next()
        .ok_or_else(|| CoreError::protocol("string payload missing bytes"))?;
    if hex.len() != trunc_len * 2 {
        return Err(CoreError::protocol(format!(
            "string payload byte count mismatch: expected {} hex chars, got {}",
            trunc_len * 2,
            hex.len()
        )));
    }
    let mut bytes = Vec::with_capacity(trunc_len);
    let mut it = hex.chars();
    for _ in 0..trunc_len {
        let hi = it.next().ok_or_else(|| CoreError::protocol("truncated hex"))?;
        let lo = it.next().ok_or_else(|| CoreError::protocol("truncated hex"))?;
        let byte = u8::from_str_radix(&format!("{hi}{lo}"), 16)
            .map_err(|e| CoreError::protocol(format!("bad hex byte: {e}")))?;
        bytes.push(byte);
    }
    Ok(Value::String {
        identity: Identity::parse_hex(addr)?,
        raw_len,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nil_roundtrips() {
        let v = Value::Nil;
        assert_eq!(Value::parse(&v.encode()).unwrap(), v);
    }

    #[test]
    fn bool_roundtrips() {
        for b in [true, false] {
            let v = Value::Boolean(b);
            assert_eq!(Value::parse(&v.encode()).unwrap(), v);
        }
    }

    #[test]
    fn int_and_float_roundtrip() {
        let v = Value::Number(Number::Int(42));
        assert_eq!(v.encode(), "n42");
        assert_eq!(Value::parse("n42").unwrap(), v);

        let v = Value::Number(Number::Float(3.5));
        assert_eq!(Value::parse(&v.encode()).unwrap(), v);
    }

    #[test]
    fn identity_kinds_roundtrip() {
        let id = Identity(0xDEAD_BEEF);
        assert_eq!(Value::Table(id).encode(), "t0xdeadbeef");
        assert_eq!(Value::parse("t0xdeadbeef").unwrap(), Value::Table(id));
        assert_eq!(Value::parse("f0xdeadbeef").unwrap(), Value::Function(id));
        assert_eq!(Value::parse("u0xdeadbeef").unwrap(), Value::UserData(id));
        assert_eq!(Value::parse("d0xdeadbeef").unwrap(), Value::Thread(id));
    }

    #[test]
    fn light_userdata_roundtrips() {
        let v = Value::LightUserData(0x1234);
        assert_eq!(v.encode(), "U0x00001234");
        assert_eq!(Value::parse(&v.encode()).unwrap(), v);
    }

    #[test]
    fn short_string_roundtrips() {
        let v = Value::string(Identity(1), b"hello");
        assert_eq!(v.encode(), "s0x00000001:5:5:68656c6c6f");
        assert_eq!(Value::parse(&v.encode()).unwrap(), v);
    }

    #[test]
    fn long_string_is_truncated_but_keeps_raw_len() {
        let raw = vec![b'x'; PROT_MAX_STR_LEN + 1];
        let v = Value::string(Identity(7), &raw);
        match &v {
            Value::String { raw_len, bytes, .. } => {
                assert_eq!(*raw_len, PROT_MAX_STR_LEN + 1);
                assert_eq!(bytes.len(), PROT_MAX_STR_LEN);
            }
            _ => panic!("expected a string value"),
        }
        // Lossy but self-consistent: decoding what we encoded gives the
        // same (already-truncated) value back.
        let decoded = Value::parse(&v.encode()).unwrap();
        assert_eq!(decoded, v);
    }
}
