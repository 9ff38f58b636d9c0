use crate::{CoreError, CoreResult, ValueKind};

/// One step of a [`FieldPath`] walk, per §3/§4.4.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// `m` — the current value's metatable.
    Meta,
    /// `n<number>` — numeric table key.
    Number(f64),
    /// `s'<raw-bytes>'` — string table key, no escaping.
    Str(Vec<u8>),
    /// `b<0|1>` — boolean table key.
    Bool(bool),
    /// `U<hex>` — light-userdata table key, by address.
    LightUserData(u64),
    /// `t|u|f|d<hex>` — match a value among the current table's values by
    /// identity and declared kind. The original C dispatches all four of
    /// these on the same `LUA_TTABLE` type code, which would make them
    /// indistinguishable; we dispatch on the selector letter itself
    /// instead, so a `u<hex>` selector only ever matches a userdata value.
    Identity {
        /// Which reference kind to match against.
        kind: ValueKind,
        /// The identity (or light-userdata address) to match.
        addr: u64,
    },
}

impl Selector {
    fn parse(tok: &str) -> CoreResult<Self> {
        let mut chars = tok.chars();
        let letter = chars
            .next()
            .ok_or_else(|| CoreError::protocol("empty field selector"))?;
        let rest = chars.as_str();
        match letter {
            'm' if rest.is_empty() => Ok(Selector::Meta),
            'n' => rest
                .parse::<f64>()
                .map(Selector::Number)
                .map_err(|e| CoreError::protocol(format!("bad numeric selector '{tok}': {e}"))),
            's' => {
                let inner = rest
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .ok_or_else(|| CoreError::protocol(format!("malformed string selector '{tok}'")))?;
                Ok(Selector::Str(inner.as_bytes().to_vec()))
            }
            'b' => match rest {
                "0" => Ok(Selector::Bool(false)),
                "1" => Ok(Selector::Bool(true)),
                other => Err(CoreError::protocol(format!("bad boolean selector: {other}"))),
            },
            'U' => parse_selector_addr(rest).map(Selector::LightUserData),
            't' => parse_selector_addr(rest).map(|addr| Selector::Identity {
                kind: ValueKind::Table,
                addr,
            }),
            'u' => parse_selector_addr(rest).map(|addr| Selector::Identity {
                kind: ValueKind::UserData,
                addr,
            }),
            'f' => parse_selector_addr(rest).map(|addr| Selector::Identity {
                kind: ValueKind::Function,
                addr,
            }),
            'd' => parse_selector_addr(rest).map(|addr| Selector::Identity {
                kind: ValueKind::Thread,
                addr,
            }),
            other => Err(CoreError::protocol(format!("unknown field selector letter '{other}'"))),
        }
    }
}

fn parse_selector_addr(rest: &str) -> CoreResult<u64> {
    let hex = rest.strip_prefix("0x").unwrap_or(rest);
    u64::from_str_radix(hex, 16).map_err(|e| CoreError::protocol(format!("bad address '{rest}': {e}")))
}

/// A possibly-empty sequence of [`Selector`]s describing a walk from a
/// root value to a subvalue, as accepted by the `w` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPath(Vec<Selector>);

impl FieldPath {
    /// The empty field path: "the root value itself".
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Iterate the selectors in walk order.
    pub fn selectors(&self) -> &[Selector] {
        &self.0
    }

    /// Parse a field-path tail as it appears after a variable name or as
    /// the whole argument in the cached form of `w`.
    ///
    /// Every selector must be introduced by a `|`; a lone trailing `|`
    /// (or an empty string) is accepted and denotes "no further steps".
    pub fn parse(s: &str) -> CoreResult<Self> {
        let mut selectors = Vec::new();
        let mut rest = s;
        loop {
            if rest.is_empty() {
                break;
            }
            rest = rest
                .strip_prefix('|')
                .ok_or_else(|| CoreError::protocol(format!("field path must start with '|': {s}")))?;
            if rest.is_empty() {
                break;
            }
            let (tok, remainder) = if let Some(after_quote) = rest.strip_prefix("s'") {
                let end = after_quote
                    .find('\'')
                    .ok_or_else(|| CoreError::protocol("unterminated string selector"))?;
                let tok_len = 2 + end + 1;
                (&rest[..tok_len], &rest[tok_len..])
            } else {
                match rest.find('|') {
                    Some(idx) => (&rest[..idx], &rest[idx..]),
                    None => (rest, ""),
                }
            };
            selectors.push(Selector::parse(tok)?);
            rest = remainder;
        }
        Ok(Self(selectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_path_is_identity() {
        assert_eq!(FieldPath::parse("").unwrap(), FieldPath::empty());
    }

    #[test]
    fn lone_trailing_pipe_is_identity() {
        assert_eq!(FieldPath::parse("|").unwrap(), FieldPath::empty());
    }

    #[test]
    fn meta_selector() {
        let fp = FieldPath::parse("|m").unwrap();
        assert_eq!(fp.selectors(), &[Selector::Meta]);
    }

    #[test]
    fn chained_selectors() {
        let fp = FieldPath::parse("|n123.4|b0|s'hello'").unwrap();
        assert_eq!(
            fp.selectors(),
            &[
                Selector::Number(123.4),
                Selector::Bool(false),
                Selector::Str(b"hello".to_vec()),
            ]
        );
    }

    #[test]
    fn string_selector_may_contain_pipe() {
        let fp = FieldPath::parse("|s'a|b'|m").unwrap();
        assert_eq!(
            fp.selectors(),
            &[Selector::Str(b"a|b".to_vec()), Selector::Meta]
        );
    }

    #[test]
    fn identity_selectors_dispatch_on_letter_not_shared_type_code() {
        let fp = FieldPath::parse("|t0xdeadbeef").unwrap();
        assert_eq!(
            fp.selectors(),
            &[Selector::Identity {
                kind: ValueKind::Table,
                addr: 0xDEAD_BEEF,
            }]
        );
        let fp = FieldPath::parse("|u0xdeadbeef").unwrap();
        assert_eq!(
            fp.selectors(),
            &[Selector::Identity {
                kind: ValueKind::UserData,
                addr: 0xDEAD_BEEF,
            }]
        );
    }

    #[test]
    fn missing_leading_pipe_is_an_error() {
        assert!(FieldPath::parse("n1").is_err());
    }
}
