//! Framed reader/writer for the line-oriented wire protocol (§4.3).
//!
//! Both ends of the connection share this module: the debuggee uses
//! [`FrameWriter`] to send `BR`/`OK`/`ER`/`QT` and [`FrameReader`] to read
//! controller commands; the controller uses it the other way around.
//! Nothing here knows what a *command* means — that is command-schema
//! knowledge that lives in `rdbg-debuggee`/`rdbg-controller`. This module
//! only knows how to find line and frame boundaries on a blocking stream.

use std::io::{BufRead, Read, Write};

use crate::{CoreError, CoreResult};

/// The two asynchronous frames the debuggee may send unprompted.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncFrame {
    /// `BR\n<path>\n<line>\n`
    Break {
        /// The canonical source path the debuggee broke in.
        path: String,
        /// The 1-based line number.
        line: u32,
    },
    /// `QT\n\n` — the script ended, the socket is about to close.
    Quit,
}

/// The fixed 3-byte-prefix reply to a controller command.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPrefix {
    /// `OK` — the payload that follows is schema-defined by the command.
    Ok,
    /// `ER\n<message>` — a semantic error; the session continues.
    Err(String),
}

/// A buffered reader over the wire that fills on demand and exposes line-
/// and frame-oriented reads. Wraps anything `BufRead`, so tests can drive
/// it with an in-memory `Cursor` instead of a real `TcpStream`.
pub struct FrameReader<R> {
    inner: R,
}

impl<R: BufRead> FrameReader<R> {
    /// Wrap an existing buffered reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read one `\n`-terminated line, with the newline stripped. Every
    /// protocol line except the raw `MEMORY` payload goes through this.
    pub fn read_line(&mut self) -> CoreResult<String> {
        let mut buf = String::new();
        let n = self.inner.read_line(&mut buf)?;
        if n == 0 {
            return Err(CoreError::Transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            )));
        }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(buf)
    }

    /// Read exactly `n` raw bytes (used for the `MEMORY` response body,
    /// which is sent verbatim, not hex-encoded).
    pub fn read_exact_bytes(&mut self, n: usize) -> CoreResult<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a `NUL`-terminated controller command line (the debuggee side
    /// of the controller → debuggee direction).
    pub fn read_command(&mut self) -> CoreResult<String> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            let n = self.inner.read(&mut byte)?;
            if n == 0 {
                return Err(CoreError::Transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "peer closed the connection",
                )));
            }
            if byte[0] == 0 {
                break;
            }
            buf.push(byte[0]);
        }
        String::from_utf8(buf).map_err(|e| CoreError::InvalidUtf8(e.utf8_error()))
    }

    /// Read an unsolicited `BR` or `QT` frame.
    pub fn read_async_frame(&mut self) -> CoreResult<AsyncFrame> {
        match self.read_line()?.as_str() {
            "BR" => {
                let path = self.read_line()?;
                let line_str = self.read_line()?;
                let line = line_str
                    .parse()
                    .map_err(|e| CoreError::protocol(format!("bad BR line number '{line_str}': {e}")))?;
                Ok(AsyncFrame::Break { path, line })
            }
            "QT" => {
                let _blank = self.read_line()?;
                Ok(AsyncFrame::Quit)
            }
            other => Err(CoreError::protocol(format!("expected BR or QT, got '{other}'"))),
        }
    }

    /// Read lines until a blank one, which is consumed but not returned.
    /// Every variable-length `OK` payload (`ll`/`lu`/`lg`/`ps`/`w`/`lb`) is
    /// terminated this way, since none of them carries an explicit count
    /// and a name or value line is never itself empty.
    pub fn read_lines_until_blank(&mut self) -> CoreResult<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Read the fixed prefix of a command reply: `OK` (payload follows,
    /// schema-specific) or `ER\n<message>`.
    pub fn read_reply_prefix(&mut self) -> CoreResult<ReplyPrefix> {
        match self.read_line()?.as_str() {
            "OK" => Ok(ReplyPrefix::Ok),
            "ER" => Ok(ReplyPrefix::Err(self.read_line()?)),
            other => Err(CoreError::protocol(format!("expected OK or ER, got '{other}'"))),
        }
    }
}

/// A buffered writer over the wire. Writes accumulate in an internal
/// buffer and are only pushed to the underlying stream on [`flush`],
/// matching the printf-style framed writer of §9: a response is built up
/// across several `write_*` calls and sent as one flush at the end.
///
/// [`flush`]: FrameWriter::flush
pub struct FrameWriter<W> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap an existing writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// Buffer one `\n`-terminated line.
    pub fn write_line(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(b'\n');
    }

    /// Buffer raw bytes verbatim, with no framing of their own (used for
    /// the `MEMORY` response body).
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Buffer an `OK` header with no payload (`SET_BREAKPOINT`,
    /// `DEL_BREAKPOINT`).
    pub fn write_ok_empty(&mut self) {
        self.write_line("OK");
    }

    /// Buffer an `OK` header, leaving the caller to append payload lines.
    pub fn begin_ok(&mut self) {
        self.write_line("OK");
    }

    /// Buffer a complete `ER` frame.
    pub fn write_error(&mut self, message: &str) {
        self.write_line("ER");
        self.write_line(message);
    }

    /// Buffer a complete `BR` frame.
    pub fn write_break(&mut self, path: &str, line: u32) {
        self.write_line("BR");
        self.write_line(path);
        self.write_line(&line.to_string());
    }

    /// Buffer a complete `QT` frame.
    pub fn write_quit(&mut self) {
        self.write_line("QT");
        self.write_line("");
    }

    /// Write a `NUL`-terminated command line and flush immediately (the
    /// controller → debuggee direction is always a single frame).
    pub fn write_command(&mut self, line: &str) -> CoreResult<()> {
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.push(0);
        self.flush()
    }

    /// Push everything buffered so far to the underlying stream.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.inner.write_all(&self.buf)?;
        self.inner.flush()?;
        self.buf.clear();
        Ok(())
    }

    /// Unwrap the writer, discarding any unflushed buffer. Mainly useful
    /// in tests that write to an in-memory `Vec<u8>` and want to inspect
    /// what was actually flushed to it.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;
    use std::io::Cursor;

    #[test]
    fn break_frame_roundtrips() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_break("foo.lua", 4);
        w.flush().unwrap();

        let mut r = FrameReader::new(BufReader::new(Cursor::new(w.inner)));
        assert_eq!(
            r.read_async_frame().unwrap(),
            AsyncFrame::Break {
                path: "foo.lua".into(),
                line: 4,
            }
        );
    }

    #[test]
    fn quit_frame_roundtrips() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_quit();
        w.flush().unwrap();

        let mut r = FrameReader::new(BufReader::new(Cursor::new(w.inner)));
        assert_eq!(r.read_async_frame().unwrap(), AsyncFrame::Quit);
    }

    #[test]
    fn ok_and_error_prefixes() {
        let mut w = FrameWriter::new(Vec::new());
        w.begin_ok();
        w.write_line("x");
        w.write_line("n42");
        w.flush().unwrap();

        let mut r = FrameReader::new(BufReader::new(Cursor::new(w.inner)));
        assert_eq!(r.read_reply_prefix().unwrap(), ReplyPrefix::Ok);
        assert_eq!(r.read_line().unwrap(), "x");
        assert_eq!(r.read_line().unwrap(), "n42");

        let mut w = FrameWriter::new(Vec::new());
        w.write_error("Variable is not found!");
        w.flush().unwrap();
        let mut r = FrameReader::new(BufReader::new(Cursor::new(w.inner)));
        assert_eq!(
            r.read_reply_prefix().unwrap(),
            ReplyPrefix::Err("Variable is not found!".into())
        );
    }

    #[test]
    fn nul_terminated_command_roundtrips() {
        let mut w = FrameWriter::new(Vec::new());
        w.write_command("sb foo.lua 10").unwrap();

        let mut r = FrameReader::new(BufReader::new(Cursor::new(w.inner)));
        assert_eq!(r.read_command().unwrap(), "sb foo.lua 10");
    }

    #[test]
    fn blank_line_terminates_a_variable_length_listing() {
        let mut w = FrameWriter::new(Vec::new());
        w.begin_ok();
        w.write_line("x");
        w.write_line("n42");
        w.write_line("y");
        w.write_line("n43");
        w.write_line("");
        w.flush().unwrap();

        let mut r = FrameReader::new(BufReader::new(Cursor::new(w.inner)));
        assert_eq!(r.read_reply_prefix().unwrap(), ReplyPrefix::Ok);
        assert_eq!(
            r.read_lines_until_blank().unwrap(),
            vec!["x", "n42", "y", "n43"]
        );
    }

    #[test]
    fn memory_payload_reads_raw_bytes() {
        let mut w = FrameWriter::new(Vec::new());
        w.begin_ok();
        w.write_line(&format!("{:08x}", 3));
        w.write_raw(b"abc");
        w.flush().unwrap();

        let mut r = FrameReader::new(BufReader::new(Cursor::new(w.inner)));
        assert_eq!(r.read_reply_prefix().unwrap(), ReplyPrefix::Ok);
        let len = usize::from_str_radix(&r.read_line().unwrap(), 16).unwrap();
        assert_eq!(r.read_exact_bytes(len).unwrap(), b"abc");
    }
}
