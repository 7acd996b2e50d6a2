//! The acknowledgment-driven serial line protocol.
//!
//! Low-cost motion controllers have input buffers of a few commands at
//! most. The contract is therefore strict lockstep: one command line out,
//! then block until a line starting with "ok" comes back, no pipelining.
//! Comment-only and blank lines are never transmitted; the controller
//! does not acknowledge comments.

use crate::sink::LineSink;
use crate::transport::ReadWrite;
use pnpkit_core::{ProtocolError, Result};
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How long the startup chatter of the controller is discarded after
/// connecting, at most.
const DRAIN_WINDOW: Duration = Duration::from_millis(1500);

/// Line sink that enforces the command/acknowledgment lockstep on a
/// bidirectional byte stream.
pub struct AckSink {
    stream: Box<dyn ReadWrite>,
    /// Bytes received past the last consumed line.
    pending: Vec<u8>,
    ack_timeout: Duration,
}

impl AckSink {
    /// Default bound on waiting for an acknowledgment. Machine moves can
    /// take a while; a controller that stays silent longer than this has
    /// lost the protocol.
    pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(60);

    /// Wrap a byte stream without touching it. The stream's own read
    /// timeout is used as the polling quantum for the bounded waits.
    pub fn new(stream: Box<dyn ReadWrite>) -> Self {
        Self::with_timeout(stream, Self::DEFAULT_ACK_TIMEOUT)
    }

    pub fn with_timeout(stream: Box<dyn ReadWrite>, ack_timeout: Duration) -> Self {
        Self {
            stream,
            pending: Vec::new(),
            ack_timeout,
        }
    }

    /// Wrap a freshly opened connection: discard whatever the controller
    /// sent on reset so the first command starts from a clean protocol
    /// state.
    pub fn connect(stream: Box<dyn ReadWrite>) -> Self {
        let mut sink = Self::new(stream);
        sink.drain_input(DRAIN_WINDOW);
        sink
    }

    /// Read and discard buffered input until the line goes quiet or the
    /// window elapses, whichever comes first.
    pub fn drain_input(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        let mut discarded = 0usize;
        let mut buf = [0u8; 256];
        while Instant::now() < deadline {
            match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => discarded += n,
                // A timed-out read means the controller is quiet now.
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    break
                }
                Err(_) => break,
            }
        }
        if discarded > 0 {
            debug!("Discarded {} bytes of controller startup output", discarded);
        }
        self.pending.clear();
    }

    /// Read one line, blocking up to the acknowledgment timeout.
    fn read_line(&mut self) -> Result<String> {
        let deadline = Instant::now() + self.ack_timeout;
        loop {
            if let Some(eol) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=eol).collect();
                return Ok(String::from_utf8_lossy(&line).trim_end().to_string());
            }
            if Instant::now() >= deadline {
                return Err(ProtocolError::AckTimeout {
                    timeout_ms: self.ack_timeout.as_millis() as u64,
                }
                .into());
            }
            let mut buf = [0u8; 256];
            match self.stream.read(&mut buf) {
                Ok(0) => return Err(ProtocolError::ConnectionClosed.into()),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    continue
                }
                Err(e) => return Err(ProtocolError::Io(e).into()),
            }
        }
    }

    /// Block until a line starting with "ok" (case-insensitive) arrives.
    /// Other controller output (status chatter) is logged and skipped.
    fn wait_for_ok(&mut self) -> Result<()> {
        loop {
            let line = self.read_line()?;
            let response = line.trim();
            if response
                .get(..2)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("ok"))
            {
                return Ok(());
            }
            if !response.is_empty() {
                debug!("Machine: {}", response);
            }
        }
    }
}

/// True for lines the controller never sees: blank, or comment-only.
fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with(';')
}

impl LineSink for AckSink {
    fn send_line(&mut self, line: &str) -> Result<()> {
        if is_comment_or_blank(line) {
            return Ok(());
        }
        trace!("-> {}", line);
        self.stream
            .write_all(line.as_bytes())
            .map_err(ProtocolError::Io)?;
        self.stream.write_all(b"\n").map_err(ProtocolError::Io)?;
        self.stream.flush().map_err(ProtocolError::Io)?;
        self.wait_for_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_and_blank_detection() {
        assert!(is_comment_or_blank(""));
        assert!(is_comment_or_blank("   "));
        assert!(is_comment_or_blank("; a comment"));
        assert!(is_comment_or_blank(";; -- Pick R1"));
        assert!(is_comment_or_blank("  ; indented comment"));
        assert!(!is_comment_or_blank("G4           ; flush buffer"));
        assert!(!is_comment_or_blank("G1 Z5.0"));
    }
}
