//! # PnPKit Jobs
//!
//! The operation schedulers: they consume a parsed board and the machine
//! configuration, decide order, and drive a [`pnpkit_machine::Machine`]
//! backend. Cancellation is polled between discrete operations only, so
//! a truncated run always leaves the machine ready for `finish()`.

pub mod bom;
pub mod dispense;
pub mod optimizer;
pub mod picknplace;

pub use bom::{bill_of_materials, BomEntry};
pub use dispense::{run_dispense, DispenseStats};
pub use optimizer::optimize_route;
pub use picknplace::{run_pick_and_place, PlaceStats};
