//! # PnPKit Calibrate
//!
//! Interactive terminal procedure that jogs the live machine to known
//! reference points on the board and derives the board origin and top
//! height for the configuration. Only useful against a real, connected
//! machine.

pub mod jog;

pub use jog::terminal_jog_config;
