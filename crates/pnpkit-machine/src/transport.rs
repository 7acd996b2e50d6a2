//! Opening the byte stream to the machine.
//!
//! The rest of the crate only needs a blocking, bidirectional stream;
//! everything serial-specific stays here.

use pnpkit_core::{ProtocolError, Result};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::info;

/// A blocking bidirectional byte stream.
pub trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

/// Polling quantum for bounded waits on the serial line. Short enough
/// that acknowledgment deadlines are checked promptly.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

const VALID_BAUD_RATES: [u32; 7] = [9600, 19200, 38400, 57600, 115200, 230400, 460800];

/// Split a connection descriptor "path[,baud]" into its parts. The baud
/// value may carry a leading 'b' ("b115200").
fn parse_descriptor(descriptor: &str) -> Result<(&str, u32)> {
    let (path, speed) = match descriptor.split_once(',') {
        Some((path, speed)) => (path, speed),
        None => (descriptor, ""),
    };
    let speed = speed.strip_prefix(['b', 'B']).unwrap_or(speed);
    if speed.is_empty() {
        return Ok((path, 115200));
    }
    let baud: u32 = speed
        .parse()
        .map_err(|_| ProtocolError::UnsupportedBaudRate {
            baud: speed.to_string(),
        })?;
    if !VALID_BAUD_RATES.contains(&baud) {
        return Err(ProtocolError::UnsupportedBaudRate {
            baud: speed.to_string(),
        }
        .into());
    }
    Ok((path, baud))
}

/// Open a serial connection to the machine.
///
/// The descriptor is "path[,baud]", e.g. "/dev/ttyUSB0,115200"; the baud
/// rate defaults to 115200. The port is configured 8N1 without flow
/// control, with a short read timeout that callers compose into bounded
/// acknowledgment waits.
pub fn open_machine_connection(descriptor: &str) -> Result<Box<dyn ReadWrite>> {
    let (path, baud) = parse_descriptor(descriptor)?;
    let port = serialport::new(path, baud)
        .timeout(READ_TIMEOUT)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .flow_control(serialport::FlowControl::None)
        .open_native()
        .map_err(|e| ProtocolError::FailedToOpen {
            descriptor: descriptor.to_string(),
            reason: e.to_string(),
        })?;
    info!("Connected to {} at {} baud", path, baud);
    Ok(Box::new(port))
}
