//! # PnPKit Core
//!
//! Core data model for the pick-and-place driver: geometry primitives,
//! the parsed board (parts and pads), feeder tape state, cooperative
//! cancellation, and the error types shared across the workspace.

pub mod board;
pub mod cancel;
pub mod error;
pub mod geometry;
pub mod tape;

pub use board::{Board, Pad, Part};
pub use cancel::CancelToken;
pub use error::{ConfigError, Error, ProtocolError, Result};
pub use geometry::{BoundingBox, Dimension, Position};
pub use tape::{SharedTape, Tape};
