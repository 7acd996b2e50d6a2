//! Line-framed command output.
//!
//! The G-code generator formats whole command blocks as text; a sink
//! receives them one line at a time. This keeps formatting and transport
//! decoupled: the file generator and the serial protocol share the same
//! command-generation layer and differ only in how a line leaves the
//! program.

use pnpkit_core::Result;
use std::io::Write;

/// Receives one command line at a time, without the trailing newline.
pub trait LineSink {
    fn send_line(&mut self, line: &str) -> Result<()>;
}

/// Sink that writes every line verbatim, comments included. Used for
/// generated G-code on stdout or in a file.
pub struct WriterSink<W: Write> {
    out: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Hand back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn send_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_sink_keeps_everything() {
        let mut sink = WriterSink::new(Vec::new());
        sink.send_line("G21        ; set to mm").unwrap();
        sink.send_line("").unwrap();
        sink.send_line("; comment only").unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "G21        ; set to mm\n\n; comment only\n");
    }
}
