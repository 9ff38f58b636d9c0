//! The controller's request/response driver (§2, §5): wait for an
//! unsolicited `BR`/`QT`, then round-trip one user command at a time
//! with the debuggee. Grounded in the original's
//! `waitForBreakOrQuit`/`waitForResponseFirstLine`/`sendCmd` trio, which
//! this type collapses into two methods over one owned connection.

use std::io::BufReader;
use std::net::TcpStream;

use rdbg_core::wire::{AsyncFrame, FrameReader, FrameWriter, ReplyPrefix};

use crate::command;
use crate::errors::ControllerError;
use crate::render;

/// What the debuggee announced since the last prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakOrQuit {
    /// A line-level pause.
    Break {
        /// The canonical source path the debuggee broke in.
        path: String,
        /// The 1-based line number.
        line: u32,
    },
    /// The script ended; the connection is about to close.
    Quit,
}

/// Owns one debuggee connection's reader/writer halves.
pub struct Driver {
    reader: FrameReader<BufReader<TcpStream>>,
    writer: FrameWriter<TcpStream>,
}

impl Driver {
    /// Wrap an already-accepted connection.
    pub fn new(sock: TcpStream) -> std::io::Result<Self> {
        let read_half = sock.try_clone()?;
        Ok(Self {
            reader: FrameReader::new(BufReader::new(read_half)),
            writer: FrameWriter::new(sock),
        })
    }

    /// Block until the debuggee sends `BR` or `QT`.
    pub fn wait_for_break_or_quit(&mut self) -> Result<BreakOrQuit, ControllerError> {
        match self.reader.read_async_frame()? {
            AsyncFrame::Break { path, line } => Ok(BreakOrQuit::Break { path, line }),
            AsyncFrame::Quit => Ok(BreakOrQuit::Quit),
        }
    }

    /// Send one user-typed line and, unless it was a resume command,
    /// read and render the reply. Resume commands (`s`/`o`/`r`) return
    /// `Ok(None)` immediately: §4.1 guarantees no `OK`/`ER` follows them,
    /// only the next `BR`.
    pub fn round_trip(&mut self, line: &str) -> Result<Option<String>, ControllerError> {
        let parsed = command::parse(line)?;
        self.writer.write_command(&parsed.wire_line)?;
        if parsed.is_resume {
            return Ok(None);
        }
        match self.reader.read_reply_prefix()? {
            ReplyPrefix::Ok => render::render(&mut self.reader, parsed.response).map(Some),
            ReplyPrefix::Err(message) => Err(ControllerError::Semantic(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdbg_core::wire::FrameWriter as CoreFrameWriter;
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::thread;

    fn pair() -> (Driver, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (Driver::new(client).unwrap(), server)
    }

    #[test]
    fn waits_for_break_frame() {
        let (mut driver, server) = pair();
        let mut w = CoreFrameWriter::new(server);
        w.write_break("foo.lua", 4);
        w.flush().unwrap();

        assert_eq!(
            driver.wait_for_break_or_quit().unwrap(),
            BreakOrQuit::Break {
                path: "foo.lua".into(),
                line: 4,
            }
        );
    }

    #[test]
    fn waits_for_quit_frame() {
        let (mut driver, server) = pair();
        let mut w = CoreFrameWriter::new(server);
        w.write_quit();
        w.flush().unwrap();

        assert_eq!(driver.wait_for_break_or_quit().unwrap(), BreakOrQuit::Quit);
    }

    #[test]
    fn resume_command_gets_no_reply() {
        let (mut driver, mut server) = pair();
        let handle = thread::spawn(move || {
            // Read the NUL-terminated command and never reply, matching
            // §4.1: no OK/ER follows a resume command.
            let mut reader = FrameReader::new(BufReader::new(server.try_clone().unwrap()));
            let cmd = reader.read_command().unwrap();
            server.flush().unwrap();
            cmd
        });

        let result = driver.round_trip("s").unwrap();
        assert_eq!(result, None);
        assert_eq!(handle.join().unwrap(), "s");
    }

    #[test]
    fn semantic_error_surfaces_the_debuggee_message() {
        let (mut driver, server) = pair();
        let mut w = CoreFrameWriter::new(server);
        w.write_error("Variable is not found!");
        w.flush().unwrap();

        let err = driver.round_trip("w").unwrap_err();
        assert!(matches!(err, ControllerError::Semantic(m) if m == "Variable is not found!"));
    }

    #[test]
    fn invalid_local_input_never_touches_the_socket() {
        let (mut driver, _server) = pair();
        assert!(matches!(
            driver.round_trip("zzz").unwrap_err(),
            ControllerError::InvalidInput
        ));
    }
}
