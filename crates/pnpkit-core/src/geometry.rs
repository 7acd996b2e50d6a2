//! Geometry primitives for board and machine-bed coordinates.
//!
//! All lengths are millimeters, all angles are degrees unless noted
//! otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A point in the X/Y plane, in mm.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Create a position from x/y coordinates.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Rotate counter-clockwise around the origin by `angle` degrees.
    pub fn rotate_deg(&self, angle: f32) -> Position {
        let rad = angle.to_radians();
        let (sin, cos) = rad.sin_cos();
        Position {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Width/height extents in mm.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub w: f32,
    pub h: f32,
}

impl Dimension {
    pub const fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }
}

/// Axis-aligned bounding box, in part-local coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub p0: Position,
    pub p1: Position,
}

impl BoundingBox {
    pub const fn new(p0: Position, p1: Position) -> Self {
        Self { p0, p1 }
    }

    pub fn width(&self) -> f32 {
        self.p1.x - self.p0.x
    }

    pub fn height(&self) -> f32 {
        self.p1.y - self.p0.y
    }
}
