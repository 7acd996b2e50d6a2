//! # PnPKit Machine
//!
//! The machine abstraction and its backends. One command-generation
//! layer (the G-code templates) feeds interchangeable line sinks: a plain
//! writer for generated files, and the acknowledgment-driven serial sink
//! for live machine control. The PostScript backend renders the same
//! operations as a drawing for dry-run validation.

pub mod ack;
pub mod gcode;
pub mod machine;
pub mod postscript;
pub mod sink;
pub mod transport;

pub use ack::AckSink;
pub use gcode::{DispenseTiming, GcodeMachine};
pub use machine::Machine;
pub use postscript::PostScriptMachine;
pub use sink::{LineSink, WriterSink};
pub use transport::{open_machine_connection, ReadWrite};
