//! Pick-and-place over all parts of a board.

use crate::optimizer::optimize_route;
use pnpkit_config::PnPConfig;
use pnpkit_core::{Board, CancelToken, Part, Result, SharedTape};
use pnpkit_machine::Machine;
use std::cmp::Ordering;
use tracing::{info, warn};

/// Outcome of a pick-and-place run.
#[derive(Debug, Clone, Copy)]
pub struct PlaceStats {
    /// Parts picked, placed and consumed from their tape.
    pub placed: usize,
    /// Parts skipped: no tape mapping, or feeder exhausted.
    pub skipped: usize,
}

struct PlaceJob<'a> {
    part: &'a Part,
    tape: Option<SharedTape>,
}

/// Place every part the configuration has a feeder for.
///
/// Parts are ordered by ascending tape height: shorter components go
/// first, so the needle's travel path over the board never knocks over
/// what is already placed. Within one height class the route optimizer
/// orders parts by board position. A part with no resolvable tape is a
/// diagnostic, not an abort. Cancellation is honored between parts only;
/// a part is never left hanging on the needle.
pub fn run_pick_and_place(
    board: &Board,
    config: &PnPConfig,
    machine: &mut dyn Machine,
    cancel: &CancelToken,
) -> Result<PlaceStats> {
    let mut jobs: Vec<PlaceJob> = board
        .parts()
        .iter()
        .map(|part| {
            let tape = config.tape_for(&part.tape_key());
            if tape.is_none() {
                warn!(
                    "No tape for {} ({})",
                    part.component_name,
                    part.tape_key()
                );
            }
            PlaceJob { part, tape }
        })
        .collect();

    jobs.sort_by(|a, b| match (&a.tape, &b.tape) {
        (Some(a), Some(b)) => a
            .borrow()
            .height()
            .partial_cmp(&b.borrow().height())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    // Short travel within each height class.
    let mut start = 0;
    while start < jobs.len() {
        let height = jobs[start].tape.as_ref().map(|t| t.borrow().height());
        let mut end = start + 1;
        while end < jobs.len()
            && jobs[end].tape.as_ref().map(|t| t.borrow().height()) == height
        {
            end += 1;
        }
        optimize_route(&mut jobs[start..end], |job| job.part.pos);
        start = end;
    }

    let mut stats = PlaceStats {
        placed: 0,
        skipped: 0,
    };
    for job in &jobs {
        if cancel.is_cancelled() {
            info!(
                "Pick-and-place cancelled after {} of {} parts",
                stats.placed,
                jobs.len()
            );
            break;
        }
        match &job.tape {
            Some(tape) => {
                machine.pick_part(job.part, Some(&*tape.borrow()))?;
                machine.place_part(job.part, Some(&*tape.borrow()))?;
                // The sole tape mutation, once per consumed part.
                if tape.borrow_mut().advance() {
                    stats.placed += 1;
                } else {
                    stats.skipped += 1;
                }
            }
            None => {
                machine.pick_part(job.part, None)?;
                machine.place_part(job.part, None)?;
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pnpkit_config::BoardConfig;
    use pnpkit_core::{BoundingBox, Dimension, Pad, Position, Tape};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Machine double that records the operation sequence.
    #[derive(Default)]
    pub(crate) struct RecordingMachine {
        pub ops: Vec<String>,
    }

    impl Machine for RecordingMachine {
        fn init(
            &mut self,
            _config: Option<&PnPConfig>,
            _comment: &str,
            _board: &Dimension,
        ) -> Result<()> {
            self.ops.push("init".to_string());
            Ok(())
        }

        fn pick_part(&mut self, part: &Part, tape: Option<&Tape>) -> Result<()> {
            let suffix = match tape {
                Some(tape) if tape.parts_available() => "",
                Some(_) => " (exhausted)",
                None => " (no tape)",
            };
            self.ops
                .push(format!("pick {}{}", part.component_name, suffix));
            Ok(())
        }

        fn place_part(&mut self, part: &Part, _tape: Option<&Tape>) -> Result<()> {
            self.ops.push(format!("place {}", part.component_name));
            Ok(())
        }

        fn dispense(&mut self, part: &Part, pad: &Pad) -> Result<()> {
            self.ops
                .push(format!("dispense {}.{}", part.component_name, pad.name));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.ops.push("finish".to_string());
            Ok(())
        }
    }

    fn part(name: &str, footprint: &str, value: &str, x: f32, y: f32) -> Part {
        Part {
            component_name: name.to_string(),
            value: value.to_string(),
            footprint: footprint.to_string(),
            pos: Position::new(x, y),
            angle: 0.0,
            front_layer: true,
            pads: vec![Pad {
                name: "1".to_string(),
                pos: Position::default(),
                size: Dimension::new(1.0, 1.0),
            }],
            bounding_box: BoundingBox::default(),
        }
    }

    fn shared_tape(z: f32, count: u32) -> SharedTape {
        let mut tape = Tape::new();
        tape.set_first_component_position(200.0, 20.0, z);
        tape.set_component_spacing(4.0, 0.0);
        tape.set_number_components(count);
        Rc::new(RefCell::new(tape))
    }

    fn config_with(tapes: &[(&str, SharedTape)]) -> PnPConfig {
        let mut config = PnPConfig {
            board: BoardConfig {
                origin: Position::new(100.0, 100.0),
                top: 12.0,
            },
            bed_level: 11.0,
            ..PnPConfig::default()
        };
        for (key, tape) in tapes {
            config
                .tape_for_component
                .insert(key.to_string(), Rc::clone(tape));
        }
        config
    }

    #[test]
    fn test_shorter_tapes_first_missing_last() {
        let board = Board::new(
            Dimension::new(50.0, 50.0),
            vec![
                part("U1", "SOT23", "BC847", 5.0, 5.0), // tall tape
                part("R1", "0805", "10k", 1.0, 1.0),    // short tape
                part("X1", "XTAL", "16M", 9.0, 9.0),    // no tape
            ],
        );
        let config = config_with(&[
            ("SOT23@BC847", shared_tape(14.0, 5)),
            ("0805@10k", shared_tape(12.0, 5)),
        ]);

        let mut machine = RecordingMachine::default();
        let stats =
            run_pick_and_place(&board, &config, &mut machine, &CancelToken::new()).unwrap();

        assert_eq!(stats.placed, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(
            machine.ops,
            vec![
                "pick R1".to_string(),
                "place R1".to_string(),
                "pick U1".to_string(),
                "place U1".to_string(),
                "pick X1 (no tape)".to_string(),
                "place X1".to_string(),
            ]
        );
    }

    #[test]
    fn test_tape_advances_once_per_part() {
        let board = Board::new(
            Dimension::new(50.0, 50.0),
            vec![
                part("R1", "0805", "10k", 1.0, 1.0),
                part("R2", "0805", "10k", 2.0, 2.0),
            ],
        );
        let tape = shared_tape(12.0, 5);
        let config = config_with(&[("0805@10k", Rc::clone(&tape))]);

        let mut machine = RecordingMachine::default();
        run_pick_and_place(&board, &config, &mut machine, &CancelToken::new()).unwrap();

        // Two parts consumed: first at x=200, second at x=204, next would
        // be at x=208.
        assert_eq!(tape.borrow().pos(), Some((208.0, 20.0, 12.0)));
    }

    #[test]
    fn test_exhausted_feeder_skips_parts_but_continues() {
        let board = Board::new(
            Dimension::new(50.0, 50.0),
            vec![
                part("R1", "0805", "10k", 1.0, 1.0),
                part("R2", "0805", "10k", 2.0, 2.0),
            ],
        );
        let tape = shared_tape(12.0, 1); // only one component left
        let config = config_with(&[("0805@10k", Rc::clone(&tape))]);

        let mut machine = RecordingMachine::default();
        let stats =
            run_pick_and_place(&board, &config, &mut machine, &CancelToken::new()).unwrap();

        assert_eq!(stats.placed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(
            machine.ops,
            vec![
                "pick R1".to_string(),
                "place R1".to_string(),
                "pick R2 (exhausted)".to_string(),
                "place R2".to_string(),
            ]
        );
        assert!(!tape.borrow().parts_available());
    }

    #[test]
    fn test_cancellation_between_parts() {
        let board = Board::new(
            Dimension::new(50.0, 50.0),
            vec![part("R1", "0805", "10k", 1.0, 1.0)],
        );
        let config = config_with(&[("0805@10k", shared_tape(12.0, 5))]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut machine = RecordingMachine::default();
        let stats = run_pick_and_place(&board, &config, &mut machine, &cancel).unwrap();

        assert_eq!(stats.placed, 0);
        assert!(machine.ops.is_empty());
    }
}
