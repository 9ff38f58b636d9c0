//! Renders a debuggee response into the text printed at the controller's
//! prompt (§4.3.2). Grounded directly in the original controller's
//! `printVar`/`lv`/`ps`/`w` rendering functions: the field labels
//! (`Type:`/`Value:`/`Name:`/`HasMetatable:`) and the table-entry
//! separator line are kept verbatim.

use std::io::BufRead;

use rdbg_core::wire::FrameReader;
use rdbg_core::{Value, ValueKind};

use crate::command::ResponseShape;
use crate::errors::ControllerError;

fn type_str(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::String => "STR",
        ValueKind::Number => "NUM",
        ValueKind::Table => "TAB",
        ValueKind::Function => "FNC",
        ValueKind::UserData => "URD",
        ValueKind::LightUserData => "LUD",
        ValueKind::Boolean => "BLN",
        ValueKind::Nil => "NIL",
        ValueKind::Thread => "THD",
    }
}

fn render_value_payload(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => u8::from(*b).to_string(),
        Value::Number(n) => n.to_string(),
        Value::Table(id) | Value::Function(id) | Value::UserData(id) | Value::Thread(id) => {
            id.to_string()
        }
        Value::LightUserData(addr) => format!("0x{addr:08x}"),
        Value::String {
            identity,
            raw_len,
            bytes,
        } => {
            let text = String::from_utf8_lossy(bytes);
            format!(
                "{identity} Length:{raw_len} Truncated-to:{} Content:{text}",
                bytes.len()
            )
        }
    }
}

/// `Type:<TAG> \tValue:<payload>`, matching `printVar()`.
fn render_value_line(line: &str) -> Result<String, ControllerError> {
    let value = Value::parse(line).map_err(ControllerError::Wire)?;
    Ok(format!(
        "Type:{} \tValue:{}",
        type_str(value.kind()),
        render_value_payload(&value)
    ))
}

fn render_name_value_list<R: BufRead>(reader: &mut FrameReader<R>) -> Result<String, ControllerError> {
    let lines = reader.read_lines_until_blank()?;
    let mut out = String::new();
    for pair in lines.chunks(2) {
        let [name, value] = pair else {
            return Err(ControllerError::Wire(rdbg_core::CoreError::protocol(
                "name/value listing had an odd number of lines",
            )));
        };
        out.push_str(&format!("Name:{name} \t{}\n", render_value_line(value)?));
    }
    Ok(out)
}

fn render_stack<R: BufRead>(reader: &mut FrameReader<R>) -> Result<String, ControllerError> {
    let lines = reader.read_lines_until_blank()?;
    let mut out = String::new();
    for frame in lines.chunks(4) {
        let [short_src, line, name, what] = frame else {
            return Err(ControllerError::Wire(rdbg_core::CoreError::protocol(
                "stack trace had a line count that is not a multiple of 4",
            )));
        };
        out.push_str(&format!("At \"{short_src}:{line}\" \t{name} \t{what}\n"));
    }
    Ok(out)
}

fn render_watch<R: BufRead>(reader: &mut FrameReader<R>) -> Result<String, ControllerError> {
    let value_line = reader.read_line()?;
    let value = Value::parse(&value_line).map_err(ControllerError::Wire)?;
    let mut out = format!("{}\n", render_value_line(&value_line)?);

    let has_meta = reader.read_line()?;
    out.push_str(match has_meta.as_str() {
        "1" => "HasMetatable:Yes\n",
        "0" => "HasMetatable:No\n",
        _ => return Err(ControllerError::Wire(rdbg_core::CoreError::protocol("bad hasMeta flag"))),
    });

    match value.kind() {
        ValueKind::Table => {
            let pairs = reader.read_lines_until_blank()?;
            for kv in pairs.chunks(2) {
                let [k, v] = kv else {
                    return Err(ControllerError::Wire(rdbg_core::CoreError::protocol(
                        "table watch had an odd number of lines",
                    )));
                };
                out.push_str("--------------------------------------------------\n");
                out.push_str(&format!("{}\n", render_value_line(k)?));
                out.push_str(&format!("{}\n", render_value_line(v)?));
            }
        }
        ValueKind::UserData => {
            let size = reader.read_line()?;
            out.push_str(&format!("Size:{size}\n"));
            consume_terminator(reader)?;
        }
        ValueKind::Function => {
            let what = reader.read_line()?;
            let short_src = reader.read_line()?;
            let line_defined = reader.read_line()?;
            let last_line_defined = reader.read_line()?;
            out.push_str(&format!(
                "What:{what} \tSource:{short_src} \tDefinedAt:{line_defined}-{last_line_defined}\n"
            ));
            consume_terminator(reader)?;
        }
        ValueKind::Thread => {
            let status = reader.read_line()?;
            out.push_str(&format!("Status:{status}\n"));
            consume_terminator(reader)?;
        }
        ValueKind::Nil | ValueKind::Boolean | ValueKind::Number | ValueKind::String | ValueKind::LightUserData => {
            consume_terminator(reader)?;
        }
    }
    Ok(out)
}

fn consume_terminator<R: BufRead>(reader: &mut FrameReader<R>) -> Result<(), ControllerError> {
    let blank = reader.read_line()?;
    if !blank.is_empty() {
        return Err(ControllerError::Wire(rdbg_core::CoreError::protocol(
            "expected blank terminator line",
        )));
    }
    Ok(())
}

fn render_breakpoints<R: BufRead>(reader: &mut FrameReader<R>) -> Result<String, ControllerError> {
    let lines = reader.read_lines_until_blank()?;
    let mut out = String::new();
    for pair in lines.chunks(2) {
        let [path, line] = pair else {
            return Err(ControllerError::Wire(rdbg_core::CoreError::protocol(
                "breakpoint listing had an odd number of lines",
            )));
        };
        out.push_str(&format!("{path}:{line}\n"));
    }
    Ok(out)
}

/// Read and render the payload that follows an `OK` header, per `shape`.
/// Returns the text to print at the controller's prompt (already
/// newline-terminated where it contains more than one line; `Empty`
/// yields an empty string, and the caller prints `OK` on its own).
pub fn render<R: BufRead>(
    reader: &mut FrameReader<R>,
    shape: ResponseShape,
) -> Result<String, ControllerError> {
    match shape {
        ResponseShape::Empty => Ok(String::new()),
        ResponseShape::NameValueList => render_name_value_list(reader),
        ResponseShape::Stack => render_stack(reader),
        ResponseShape::Watch => render_watch(reader),
        ResponseShape::Breakpoints => render_breakpoints(reader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdbg_core::wire::FrameWriter;
    use std::io::{BufReader, Cursor};

    fn reader_over(bytes: Vec<u8>) -> FrameReader<BufReader<Cursor<Vec<u8>>>> {
        FrameReader::new(BufReader::new(Cursor::new(bytes)))
    }

    #[test]
    fn name_value_list_renders_type_and_value() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_line("x");
        w.write_line("n42");
        w.write_line("");
        w.flush().unwrap();
        let mut r = reader_over(w.into_inner());
        let text = render(&mut r, ResponseShape::NameValueList).unwrap();
        assert_eq!(text, "Name:x \tType:NUM \tValue:42\n");
    }

    #[test]
    fn stack_renders_one_line_per_frame() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_line("foo.lua");
        w.write_line("10");
        w.write_line("bar");
        w.write_line("Lua");
        w.write_line("");
        w.flush().unwrap();
        let mut r = reader_over(w.into_inner());
        let text = render(&mut r, ResponseShape::Stack).unwrap();
        assert_eq!(text, "At \"foo.lua:10\" \tbar \tLua\n");
    }

    #[test]
    fn watch_of_a_table_renders_a_separator_per_entry() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_line("t0xdeadbeef");
        w.write_line("0");
        w.write_line("s0x00000001:1:1:61");
        w.write_line("n7");
        w.write_line("");
        w.flush().unwrap();
        let mut r = reader_over(w.into_inner());
        let text = render(&mut r, ResponseShape::Watch).unwrap();
        assert!(text.contains("HasMetatable:No"));
        assert!(text.contains("--------------------------------------------------"));
        assert!(text.contains("Value:7"));
    }

    #[test]
    fn watch_of_a_number_consumes_the_terminator() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_line("n42");
        w.write_line("0");
        w.write_line("");
        w.flush().unwrap();
        let mut r = reader_over(w.into_inner());
        let text = render(&mut r, ResponseShape::Watch).unwrap();
        assert!(text.contains("Value:42"));
        assert!(text.contains("HasMetatable:No"));
    }

    #[test]
    fn name_value_list_renders_a_string_with_its_identity_prefix() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_line("greeting");
        w.write_line("s0x00000001:5:5:68656c6c6f");
        w.write_line("");
        w.flush().unwrap();
        let mut r = reader_over(w.into_inner());
        let text = render(&mut r, ResponseShape::NameValueList).unwrap();
        assert_eq!(
            text,
            "Name:greeting \tType:STR \tValue:0x00000001 Length:5 Truncated-to:5 Content:hello\n"
        );
    }

    #[test]
    fn breakpoints_render_path_colon_line() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_line("a.lua");
        w.write_line("3");
        w.write_line("");
        w.flush().unwrap();
        let mut r = reader_over(w.into_inner());
        let text = render(&mut r, ResponseShape::Breakpoints).unwrap();
        assert_eq!(text, "a.lua:3\n");
    }
}
