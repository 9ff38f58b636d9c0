//! Command-line tokenizer shared by both ends: the controller uses it on
//! the developer's typed input, the debuggee uses it on the command line
//! it reads off the wire (the two grammars are identical by construction,
//! since the controller only ever forwards what it already tokenized).

use crate::{CoreError, CoreResult};

/// Protocol guarantees at least this many tokens fit in one command line.
pub const PROT_MAX_ARGS: usize = 8;

/// Split `line` on whitespace, honoring `"..."` as a single token (the
/// closing quote is mandatory; there is no escape mechanism). Stops after
/// `max_tokens` tokens, mirroring the wire's fixed argument budget.
pub fn tokenize(line: &str, max_tokens: usize) -> CoreResult<Vec<String>> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() && tokens.len() < max_tokens {
        while i < bytes.len() && bytes[i] == b' ' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'"' {
            i += 1;
            let start = i;
            let end = line[i..]
                .find('"')
                .map(|off| i + off)
                .ok_or_else(|| CoreError::protocol("unterminated quoted token"))?;
            tokens.push(line[start..end].to_string());
            i = end + 1;
        } else {
            let start = i;
            while i < bytes.len() && bytes[i] != b' ' {
                i += 1;
            }
            tokens.push(line[start..i].to_string());
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(
            tokenize("sb foo.lua 10", PROT_MAX_ARGS).unwrap(),
            vec!["sb", "foo.lua", "10"]
        );
    }

    #[test]
    fn quoted_token_may_contain_spaces() {
        assert_eq!(
            tokenize(r#"sb "a file.lua" 10"#, PROT_MAX_ARGS).unwrap(),
            vec!["sb", "a file.lua", "10"]
        );
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(tokenize(r#"sb "a file.lua 10"#, PROT_MAX_ARGS).is_err());
    }

    #[test]
    fn respects_max_tokens() {
        assert_eq!(tokenize("a b c d", 2).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn empty_line_yields_no_tokens() {
        assert_eq!(tokenize("   ", PROT_MAX_ARGS).unwrap(), Vec::<String>::new());
    }
}
