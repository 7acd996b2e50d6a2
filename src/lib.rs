//! # PnPKit
//!
//! A pick-and-place and solder-paste-dispensing driver for 3D-printer
//! style motion controllers, fed from KiCad board reports.
//!
//! ## Architecture
//!
//! PnPKit is organized as a workspace with multiple crates:
//!
//! 1. **pnpkit-core** - geometry, board model, feeder tapes, errors
//! 2. **pnpkit-config** - the TOML machine configuration
//! 3. **pnpkit-machine** - the machine trait and its backends (G-code
//!    text, acknowledgment-driven serial protocol, PostScript preview)
//! 4. **pnpkit-jobs** - dispensing and pick-and-place schedulers
//! 5. **pnpkit-calibrate** - interactive board origin calibration
//! 6. **pnpkit** - this binary, which ties the pieces together

pub mod rpt;

pub use pnpkit_config::{config_template, PnPConfig};
pub use pnpkit_core::{
    Board, BoundingBox, CancelToken, Dimension, Error, Pad, Part, Position, Result, Tape,
};
pub use pnpkit_machine::{
    open_machine_connection, AckSink, DispenseTiming, GcodeMachine, Machine, PostScriptMachine,
    WriterSink,
};

/// Initialize the tracing subscriber.
///
/// All diagnostics go to stderr: stdout carries generated machine output
/// (G-code, PostScript) and must stay syntactically clean even when the
/// run is chatty.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
