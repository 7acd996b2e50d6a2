//! Solder paste dispensing over all pads of a board.

use crate::optimizer::optimize_route;
use pnpkit_core::{Board, CancelToken, Pad, Part, Position, Result};
use pnpkit_machine::{DispenseTiming, Machine};
use tracing::info;

/// Outcome of a dispense run.
#[derive(Debug, Clone, Copy)]
pub struct DispenseStats {
    /// Pads actually dispensed on.
    pub pads_dispensed: usize,
    /// All pads the board offered.
    pub pads_total: usize,
    /// Paste time for the dispensed pads, milliseconds.
    pub estimated_ms: f32,
}

struct PadStop<'a> {
    part: &'a Part,
    pad: &'a Pad,
    /// Board-relative pad position, part rotation applied.
    pos: Position,
}

/// Dispense on every pad, in nearest-neighbor order over absolute pad
/// positions. Cancellation truncates the run between pads; a partial run
/// is fine and the machine stays ready for `finish()`.
pub fn run_dispense(
    board: &Board,
    machine: &mut dyn Machine,
    cancel: &CancelToken,
    timing: DispenseTiming,
) -> Result<DispenseStats> {
    let mut route: Vec<PadStop> = board
        .parts()
        .iter()
        .flat_map(|part| {
            part.pads.iter().map(move |pad| PadStop {
                part,
                pad,
                pos: part.pad_abs_pos(pad),
            })
        })
        .collect();
    optimize_route(&mut route, |stop| stop.pos);

    let mut stats = DispenseStats {
        pads_dispensed: 0,
        pads_total: route.len(),
        estimated_ms: 0.0,
    };
    for stop in &route {
        if cancel.is_cancelled() {
            info!(
                "Dispensing cancelled after {} of {} pads",
                stats.pads_dispensed, stats.pads_total
            );
            break;
        }
        machine.dispense(stop.part, stop.pad)?;
        stats.pads_dispensed += 1;
        stats.estimated_ms += timing.init_ms + stop.pad.area() * timing.area_ms;
    }
    Ok(stats)
}
