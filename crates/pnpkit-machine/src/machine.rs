//! The machine abstraction: everything a backend must be able to do.

use pnpkit_config::PnPConfig;
use pnpkit_core::{Dimension, Pad, Part, Result, Tape};

/// A machine provides the actions of a production run.
///
/// Backends are exchangeable: the same schedulers drive the G-code text
/// generator, the live serial connection and the PostScript preview.
/// Tape positions are absolute bed coordinates; part positions are
/// relative to the configured board origin.
pub trait Machine {
    /// Prepare the machine. The comment is added to the output where the
    /// backend has a place for it. Fails when the backend needs a
    /// configuration and none is given.
    fn init(
        &mut self,
        config: Option<&PnPConfig>,
        init_comment: &str,
        board: &Dimension,
    ) -> Result<()>;

    /// Pick `part` from `tape`. Without a tape, or with an exhausted one,
    /// this emits a diagnostic and no motion.
    fn pick_part(&mut self, part: &Part, tape: Option<&Tape>) -> Result<()>;

    /// Place `part`, previously picked from `tape`, on the board.
    fn place_part(&mut self, part: &Part, tape: Option<&Tape>) -> Result<()>;

    /// Dispense solder paste on one pad of `part`.
    fn dispense(&mut self, part: &Part, pad: &Pad) -> Result<()>;

    /// Shut down: park the axes, disengage the motors. Must be safe to
    /// call after a cancelled or partially completed run.
    fn finish(&mut self) -> Result<()>;
}
