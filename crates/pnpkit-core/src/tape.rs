//! Feeder tape state: a linear strip of identical components, consumed
//! front to back.

use std::cell::RefCell;
use std::rc::Rc;

/// A tape shared between all component keys it feeds. Multiple
/// `<footprint>@<value>` keys may resolve to the same physical feeder.
pub type SharedTape = Rc<RefCell<Tape>>;

/// Mutable feeder state. Positions are absolute machine-bed coordinates.
///
/// Peeking and consuming are separate: [`Tape::pos`] never changes state,
/// [`Tape::advance`] is the sole mutator. A dry-run pass (e.g. the
/// PostScript preview) can therefore look at positions before a production
/// run commits to consuming them.
#[derive(Debug, Default, Clone)]
pub struct Tape {
    x: f32,
    y: f32,
    z: f32,
    dx: f32,
    dy: f32,
    angle: f32,
    slant: f32,
    count: u32,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute bed position of the first component on the tape.
    pub fn set_first_component_position(&mut self, x: f32, y: f32, z: f32) {
        self.x = x;
        self.y = y;
        self.z = z;
    }

    /// Distance between two adjacent components.
    /// Components on one tape do not differ in height.
    pub fn set_component_spacing(&mut self, dx: f32, dy: f32) {
        self.dx = dx;
        self.dy = dy;
    }

    /// Rotation of the components as declared by the feeder setup, degrees.
    pub fn set_angle(&mut self, a: f32) {
        self.angle = a;
    }

    /// Empirical correction for how the tape lies on the bed relative to
    /// its declared rotation. Always configured, never inferred.
    pub fn set_slant_angle(&mut self, a: f32) {
        self.slant = a;
    }

    /// Number of components left on the tape.
    pub fn set_number_components(&mut self, n: u32) {
        self.count = n;
    }

    /// The angle components are picked up with: declared rotation plus the
    /// slant correction.
    pub fn angle(&self) -> f32 {
        self.angle + self.slant
    }

    /// Top of the tape. Invariant across the whole tape.
    pub fn height(&self) -> f32 {
        self.z
    }

    pub fn parts_available(&self) -> bool {
        self.count > 0
    }

    /// Position of the current, not yet consumed component. `None` once
    /// the tape is exhausted. Never advances.
    pub fn pos(&self) -> Option<(f32, f32, f32)> {
        if self.count == 0 {
            return None;
        }
        Some((self.x, self.y, self.z))
    }

    /// Consume the current component: step one spacing further. Returns
    /// false, changing nothing, once the tape is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.x += self.dx;
        self.y += self.dy;
        self.count -= 1;
        true
    }
}
