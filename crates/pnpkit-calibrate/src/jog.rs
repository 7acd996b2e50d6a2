//! The jog calibration procedure.
//!
//! Homes the machine, then lets the operator steer the needle onto a
//! known pad with the cursor keys. The difference between where the pad
//! should be and where it actually is becomes the new board origin; the
//! needle height becomes the new board top. A second reference point is
//! shown as a sanity check for board rotation.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use pnpkit_config::PnPConfig;
use pnpkit_core::{Board, Error, Part, Position, Result};
use pnpkit_machine::{AckSink, LineSink};

/// Hover above the expected surface while approaching it.
const SAFE_HOVERING: f32 = 5.0;

const SMALL_JOG: f32 = 0.1;
const BIG_JOG: f32 = 1.0;

/// What one keystroke means in the jog loop.
#[derive(Debug, Clone, Copy, PartialEq)]
enum JogAction {
    Move { dx: f32, dy: f32, dz: f32 },
    Commit,
    Abort,
}

/// Map a decoded keystroke to its jog action. Shift or Ctrl switches
/// from 0.1mm to 1.0mm steps. Unknown keys map to `None` and are
/// reported by the caller, never fatal.
fn jog_action(key: &KeyEvent) -> Option<JogAction> {
    let big = key
        .modifiers
        .intersects(KeyModifiers::SHIFT | KeyModifiers::CONTROL);
    let step = if big { BIG_JOG } else { SMALL_JOG };
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(JogAction::Abort)
        }
        KeyCode::Up => Some(JogAction::Move {
            dx: 0.0,
            dy: step,
            dz: 0.0,
        }),
        KeyCode::Down => Some(JogAction::Move {
            dx: 0.0,
            dy: -step,
            dz: 0.0,
        }),
        KeyCode::Right => Some(JogAction::Move {
            dx: step,
            dy: 0.0,
            dz: 0.0,
        }),
        KeyCode::Left => Some(JogAction::Move {
            dx: -step,
            dy: 0.0,
            dz: 0.0,
        }),
        KeyCode::Char('u') | KeyCode::Char('U') => Some(JogAction::Move {
            dx: 0.0,
            dy: 0.0,
            dz: step,
        }),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(JogAction::Move {
            dx: 0.0,
            dy: 0.0,
            dz: -step,
        }),
        KeyCode::Enter | KeyCode::Char('q') => Some(JogAction::Commit),
        KeyCode::Esc => Some(JogAction::Abort),
        _ => None,
    }
}

/// Puts the terminal into raw mode and restores it when dropped, on
/// every exit path.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Block for one key press. Raw mode is scoped to the read, so regular
/// stderr output between keystrokes behaves normally.
fn read_key() -> Result<KeyEvent> {
    let _guard = RawModeGuard::enter()?;
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(key);
            }
        }
    }
}

/// The part nearest to `pos` that has at least one pad to aim for.
fn find_part_closest_to<'a>(parts: &'a [Part], pos: Position) -> Option<&'a Part> {
    let mut result: Option<&Part> = None;
    let mut closest = f32::INFINITY;
    for part in parts {
        if part.pads.is_empty() {
            continue;
        }
        let distance = part.pos.distance(&pos);
        if distance < closest {
            result = Some(part);
            closest = distance;
        }
    }
    result
}

/// Jog the machine from the expected position to where the reference
/// point actually is. Returns false if the operator aborted.
fn jog_to(link: &mut AckSink, target: &mut Position, z: &mut f32) -> Result<bool> {
    let start_pos = *target;
    let start_z = *z - SAFE_HOVERING;
    eprintln!("-----------------------------------------");
    eprintln!("Cursor keys: move x/y on bed");
    eprintln!("             u=needle up, d=needle down");
    eprintln!("Default:     0.1mm steps");
    eprintln!("+Shift/Ctrl: 1.0mm steps (FAST)");
    eprintln!("Enter/q: accept position, Esc/Ctrl-C: abort");
    eprintln!("-----------------------------------------");

    let success = loop {
        link.send_line(&format!(
            "G1 X{:.3} Y{:.3} Z{:.3}",
            target.x, target.y, *z
        ))?;
        let delta = *target - start_pos;
        eprint!(
            "\rDelta: ({:.1}, {:.1}) ; top-of-board: {:.1}  ",
            delta.x,
            delta.y,
            *z - start_z
        );

        let key = read_key()?;
        match jog_action(&key) {
            Some(JogAction::Move { dx, dy, dz }) => {
                target.x += dx;
                target.y += dy;
                *z += dz;
            }
            Some(JogAction::Commit) => break true,
            Some(JogAction::Abort) => break false,
            None => eprintln!("unexpected key: {:?}", key.code),
        }
    };
    eprintln!();
    eprintln!("-----------------------------------------");
    link.send_line("M84")?;
    if !success {
        eprintln!("Aborting requested.");
    }
    Ok(success)
}

/// Calibrate the board origin and top height against the live machine.
///
/// Returns false when the operator aborted; the configuration is only
/// modified on a committed first reference point.
pub fn terminal_jog_config(
    board: &Board,
    link: &mut AckSink,
    config: &mut PnPConfig,
) -> Result<bool> {
    // Home one axis at a time; Y first so the probe area is clear, and Z
    // last, when the needle is over free space.
    link.send_line("G28 Y0")?;
    link.send_line("G1 Y140")?;
    link.send_line("G28 X0")?;
    link.send_line("G28 Z0")?;
    link.send_line(&format!("G1 Z{:.1}", SAFE_HOVERING))?;

    let near_part = find_part_closest_to(board.parts(), Position::new(0.0, 0.0))
        .ok_or_else(|| Error::other("No part with a pad found on this board"))?;

    let predicted = config.board.origin + near_part.pad_abs_pos(&near_part.pads[0]);
    eprintln!(
        "Find pad '{}' of {} {} and touch it with the needle.",
        near_part.pads[0].name, near_part.component_name, predicted
    );
    let mut measured = predicted;
    let mut z = config.board.top + SAFE_HOVERING;
    if !jog_to(link, &mut measured, &mut z)? {
        return Ok(false);
    }

    config.board.top = z;
    let delta = measured - predicted;
    config.board.origin = config.board.origin + delta;
    eprintln!("Delta to original: {}", delta);

    // Second reference near the far corner: show where it should be now.
    // Board rotation is not compensated; a mismatch here means the board
    // is not square with the bed.
    let far_part = find_part_closest_to(
        board.parts(),
        Position::new(board.dimension().w, board.dimension().h),
    )
    .ok_or_else(|| Error::other("No part with a pad found on this board"))?;
    let check = config.board.origin + far_part.pad_abs_pos(&far_part.pads[0]);
    eprintln!();
    eprintln!(
        "Check: this is pad '{}' of {} {}.",
        far_part.pads[0].name, far_part.component_name, check
    );
    eprintln!("If this does not match, abort and straighten the board");
    eprintln!("to be perfectly square with the bed.");

    link.send_line(&format!("G1 Z{:.3}", z + 10.0))?;
    link.send_line(&format!("G1 X{:.3} Y{:.3}", check.x, check.y))?;
    link.send_line(&format!("G1 Z{:.3}", z))?;

    eprintln!();
    eprintln!("[ OK? Enter. Otherwise: Esc/Ctrl-C ]");
    let key = read_key()?;
    let confirmed = !matches!(jog_action(&key), Some(JogAction::Abort));

    link.send_line(&format!("G1 Z{:.3}", config.board.top + SAFE_HOVERING))?;
    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnpkit_core::{BoundingBox, Dimension, Pad};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_plain_arrows_step_small() {
        assert_eq!(
            jog_action(&key(KeyCode::Up, KeyModifiers::NONE)),
            Some(JogAction::Move {
                dx: 0.0,
                dy: SMALL_JOG,
                dz: 0.0
            })
        );
        assert_eq!(
            jog_action(&key(KeyCode::Left, KeyModifiers::NONE)),
            Some(JogAction::Move {
                dx: -SMALL_JOG,
                dy: 0.0,
                dz: 0.0
            })
        );
    }

    #[test]
    fn test_modified_arrows_step_big() {
        assert_eq!(
            jog_action(&key(KeyCode::Down, KeyModifiers::SHIFT)),
            Some(JogAction::Move {
                dx: 0.0,
                dy: -BIG_JOG,
                dz: 0.0
            })
        );
        assert_eq!(
            jog_action(&key(KeyCode::Right, KeyModifiers::CONTROL)),
            Some(JogAction::Move {
                dx: BIG_JOG,
                dy: 0.0,
                dz: 0.0
            })
        );
    }

    #[test]
    fn test_needle_keys() {
        assert_eq!(
            jog_action(&key(KeyCode::Char('u'), KeyModifiers::NONE)),
            Some(JogAction::Move {
                dx: 0.0,
                dy: 0.0,
                dz: SMALL_JOG
            })
        );
        // Shifted letter arrives as the uppercase char plus the modifier.
        assert_eq!(
            jog_action(&key(KeyCode::Char('D'), KeyModifiers::SHIFT)),
            Some(JogAction::Move {
                dx: 0.0,
                dy: 0.0,
                dz: -BIG_JOG
            })
        );
        assert_eq!(
            jog_action(&key(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            Some(JogAction::Move {
                dx: 0.0,
                dy: 0.0,
                dz: -BIG_JOG
            })
        );
    }

    #[test]
    fn test_commit_abort_and_unknown() {
        assert_eq!(
            jog_action(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(JogAction::Commit)
        );
        assert_eq!(
            jog_action(&key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(JogAction::Commit)
        );
        assert_eq!(
            jog_action(&key(KeyCode::Esc, KeyModifiers::NONE)),
            Some(JogAction::Abort)
        );
        assert_eq!(
            jog_action(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(JogAction::Abort)
        );
        // Plain 'c' is not Ctrl-C.
        assert_eq!(jog_action(&key(KeyCode::Char('c'), KeyModifiers::NONE)), None);
        assert_eq!(jog_action(&key(KeyCode::Tab, KeyModifiers::NONE)), None);
    }

    fn part(name: &str, x: f32, y: f32, with_pad: bool) -> Part {
        Part {
            component_name: name.to_string(),
            value: "1k".to_string(),
            footprint: "0805".to_string(),
            pos: Position::new(x, y),
            angle: 0.0,
            front_layer: true,
            pads: if with_pad {
                vec![Pad {
                    name: "1".to_string(),
                    pos: Position::default(),
                    size: Dimension::new(1.0, 1.0),
                }]
            } else {
                Vec::new()
            },
            bounding_box: BoundingBox::default(),
        }
    }

    #[test]
    fn test_closest_part_needs_a_pad() {
        let parts = vec![
            part("FID1", 1.0, 1.0, false), // closest, but no pad
            part("R1", 5.0, 5.0, true),
            part("R2", 20.0, 20.0, true),
        ];
        let found = find_part_closest_to(&parts, Position::new(0.0, 0.0)).unwrap();
        assert_eq!(found.component_name, "R1");
    }

    #[test]
    fn test_no_candidate_without_pads() {
        let parts = vec![part("FID1", 1.0, 1.0, false)];
        assert!(find_part_closest_to(&parts, Position::new(0.0, 0.0)).is_none());
    }
}
