//! The parsed circuit board: parts and their pads.
//!
//! Everything here is immutable after construction by the board loader.
//! Part positions are relative to the board origin; pad positions are
//! relative to their part's center, unrotated.

use crate::geometry::{BoundingBox, Dimension, Position};

/// A solder pad of a part.
#[derive(Debug, Clone)]
pub struct Pad {
    /// Pad name as printed on the footprint, e.g. "1" or "GND".
    pub name: String,
    /// Position relative to the owning part, before part rotation.
    pub pos: Position,
    /// Copper extents of the pad.
    pub size: Dimension,
}

impl Pad {
    /// Pad area in mm^2. Determines the paste dispense time.
    pub fn area(&self) -> f32 {
        self.size.w * self.size.h
    }
}

/// One component placement on the board.
#[derive(Debug, Clone)]
pub struct Part {
    /// Component reference, e.g. "R42".
    pub component_name: String,
    /// Component value, e.g. "100k".
    pub value: String,
    /// Footprint name, e.g. "0805".
    pub footprint: String,
    /// Position relative to the board origin.
    pub pos: Position,
    /// Rotation in degrees.
    pub angle: f32,
    /// Whether the part sits on the front copper layer.
    pub front_layer: bool,
    /// Pads of this part, for paste dispensing.
    pub pads: Vec<Pad>,
    /// Extents relative to `pos`.
    pub bounding_box: BoundingBox,
}

impl Part {
    /// Board-relative position of one of our pads, with the part rotation
    /// applied.
    pub fn pad_abs_pos(&self, pad: &Pad) -> Position {
        self.pos + pad.pos.rotate_deg(self.angle)
    }

    /// The key used to look up the feeder tape: `<footprint>@<value>`.
    pub fn tape_key(&self) -> String {
        format!("{}@{}", self.footprint, self.value)
    }
}

/// A board: its outline and the parts to process, in file order.
#[derive(Debug, Default)]
pub struct Board {
    dimension: Dimension,
    parts: Vec<Part>,
}

impl Board {
    pub fn new(dimension: Dimension, parts: Vec<Part>) -> Self {
        Self { dimension, parts }
    }

    /// Overall board outline.
    pub fn dimension(&self) -> &Dimension {
        &self.dimension
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_part(pos: Position, angle: f32, pad_pos: Position) -> Part {
        Part {
            component_name: "R1".to_string(),
            value: "100k".to_string(),
            footprint: "0805".to_string(),
            pos,
            angle,
            front_layer: true,
            pads: vec![Pad {
                name: "1".to_string(),
                pos: pad_pos,
                size: Dimension::new(1.0, 1.0),
            }],
            bounding_box: BoundingBox::default(),
        }
    }

    #[test]
    fn test_pad_abs_pos_with_rotation() {
        // Part at (50, 30) rotated 90 degrees, pad at part-local (2, 0):
        // cos 90 = 0, sin 90 = 1, so the pad ends up at (50, 32).
        let part = test_part(Position::new(50.0, 30.0), 90.0, Position::new(2.0, 0.0));
        let abs = part.pad_abs_pos(&part.pads[0]);
        assert!((abs.x - 50.0).abs() < 1e-4);
        assert!((abs.y - 32.0).abs() < 1e-4);
    }

    #[test]
    fn test_pad_abs_pos_without_rotation() {
        let part = test_part(Position::new(10.0, 10.0), 0.0, Position::new(2.0, 1.0));
        let abs = part.pad_abs_pos(&part.pads[0]);
        assert!((abs.x - 12.0).abs() < 1e-6);
        assert!((abs.y - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_tape_key() {
        let part = test_part(Position::default(), 0.0, Position::default());
        assert_eq!(part.tape_key(), "0805@100k");
    }

    #[test]
    fn test_pad_area() {
        let pad = Pad {
            name: "1".to_string(),
            pos: Position::default(),
            size: Dimension::new(2.0, 1.5),
        };
        assert_eq!(pad.area(), 3.0);
    }
}
