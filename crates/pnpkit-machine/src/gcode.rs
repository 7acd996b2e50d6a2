//! G-code generation for pick, place and dispense operations.
//!
//! Every operation is rendered from a command template and pushed through
//! the configured [`LineSink`]. All z-heights are derived from the
//! configuration (bed level, board top, tape heights), never hand-tuned
//! per call.

use crate::machine::Machine;
use crate::sink::LineSink;
use pnpkit_config::PnPConfig;
use pnpkit_core::{ConfigError, Dimension, Pad, Part, Position, Result, Tape};
use tracing::{info, warn};

/// Hover clearance above obstructions while transporting a component.
const PNP_Z_HOVERING: f32 = 10.0;

/// Components rest slightly proud of the tape pocket.
const PNP_TAPE_THICK: f32 = 0.0;

/// E-axis units for 360 degrees of needle rotation. Specific to the
/// stepper gearing of the machine.
const PNP_ANGLE_FACTOR: f32 = 50.34965 / 360.0;

// Speeds in mm/s.
const PNP_TO_TAPE_SPEED: f32 = 1000.0;
const PNP_TO_BOARD_SPEED: f32 = 100.0;
const DISP_MOVE_SPEED: f32 = 1000.0;
const DISP_DISPENSE_SPEED: f32 = 100.0;

// Dispense heights above the board top.
const DISP_Z_DISPENSING_ABOVE: f32 = 0.3;
const DISP_Z_HOVER_ABOVE: f32 = 2.0;
const DISP_Z_SEPARATE_DROPLET_ABOVE: f32 = 5.0;

/// How long the paste solenoid stays open per pad.
#[derive(Debug, Clone, Copy)]
pub struct DispenseTiming {
    /// Base time per pad, milliseconds.
    pub init_ms: f32,
    /// Additional time per mm^2 of pad area, milliseconds.
    pub area_ms: f32,
}

impl Default for DispenseTiming {
    fn default() -> Self {
        Self {
            init_ms: 50.0,
            area_ms: 25.0,
        }
    }
}

/// The G-code generating machine. Emits command blocks through a line
/// sink; with a [`crate::WriterSink`] this produces a G-code file, with an
/// [`crate::AckSink`] it drives the machine live.
pub struct GcodeMachine<S: LineSink> {
    sink: S,
    timing: DispenseTiming,
    config: Option<PnPConfig>,
}

impl<S: LineSink> GcodeMachine<S> {
    pub fn new(sink: S, timing: DispenseTiming) -> Self {
        Self {
            sink,
            timing,
            config: None,
        }
    }

    /// Hand back the underlying sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn send(&mut self, block: &str) -> Result<()> {
        for line in block.lines() {
            self.sink.send_line(line)?;
        }
        Ok(())
    }

    fn board_thickness(&self) -> Result<f32> {
        let config = self.config.as_ref().ok_or(ConfigError::MissingConfig)?;
        Ok(config.board.top - config.bed_level)
    }

    fn board_origin(&self) -> Result<Position> {
        let config = self.config.as_ref().ok_or(ConfigError::MissingConfig)?;
        Ok(config.board.origin)
    }

    fn board_top(&self) -> Result<f32> {
        let config = self.config.as_ref().ok_or(ConfigError::MissingConfig)?;
        Ok(config.board.top)
    }
}

impl<S: LineSink> Machine for GcodeMachine<S> {
    fn init(
        &mut self,
        config: Option<&PnPConfig>,
        init_comment: &str,
        _board: &Dimension,
    ) -> Result<()> {
        let config = config.cloned().ok_or(ConfigError::MissingConfig)?;
        info!(
            "Board thickness = {:.1}mm",
            config.board.top - config.bed_level
        );

        // The parking height must clear the tallest tape on the bed.
        let mut highest_tape = config.board.top;
        for tape in config.tape_for_component.values() {
            highest_tape = highest_tape.max(tape.borrow().height());
        }
        self.config = Some(config);

        self.send(&format!("; {}", init_comment))?;
        self.send(&format!(
            "\n\
             G28 X0 Y0  ; Home (x/y) - needle over free space\n\
             G28 Z0     ; Now it is safe to home z\n\
             G21        ; set to mm\n\
             T1         ; Use E1 extruder, our 'A' axis.\n\
             M302       ; cold extrusion override - because it is not actually an extruder.\n\
             G90        ; Use absolute positions in general.\n\
             G92 E0     ; 'home' E axis\n\
             \n\
             G1 Z{:.1} E0 ; Move needle out of way\n",
            highest_tape + PNP_Z_HOVERING
        ))
    }

    fn pick_part(&mut self, part: &Part, tape: Option<&Tape>) -> Result<()> {
        let Some(tape) = tape else {
            warn!(
                "No tape to pick {} ({}) from",
                part.component_name,
                part.tape_key()
            );
            return Ok(());
        };
        let Some((px, py, _)) = tape.pos() else {
            warn!(
                "We are out of components for {} {}",
                part.footprint, part.value
            );
            return Ok(());
        };

        let travel_height = tape.height() + self.board_thickness()? + PNP_Z_HOVERING;
        let block = format!(
            "\n\
             ;; -- Pick {name}\n\
             G0 F{feed} X{x:.3} Y{y:.3} Z{z_approach:.3} E{e:.3} ; Move over component to pick.\n\
             G1 Z{z_down:<6.2}   F4000 ; move down on tape.\n\
             G4           ; flush buffer\n\
             M42 P6 S255  ; turn on suckage\n\
             G1 Z{z_travel:<6.3}   ; Move up a bit for travelling\n",
            name = format!("{} ({})", part.component_name, part.tape_key()),
            feed = (60.0 * PNP_TO_TAPE_SPEED) as i32,
            x = px,
            y = py,
            z_approach = tape.height() + PNP_Z_HOVERING,
            e = PNP_ANGLE_FACTOR * (tape.angle() % 360.0),
            z_down = tape.height(),
            z_travel = travel_height,
        );
        self.send(&block)
    }

    fn place_part(&mut self, part: &Part, tape: Option<&Tape>) -> Result<()> {
        let Some(tape) = tape else {
            warn!(
                "No tape known for {} ({}); not placed",
                part.component_name,
                part.tape_key()
            );
            return Ok(());
        };

        let board_thick = self.board_thickness()?;
        let origin = self.board_origin()?;
        let travel_height = tape.height() + board_thick + PNP_Z_HOVERING;
        let block = format!(
            "\n\
             ;; -- Place {name}\n\
             G0 F{feed} X{x:.3} Y{y:.3} Z{z_travel:.3} E{e:.3} ; Move component to place on board.\n\
             G1 Z{z_down:<6.3} F4000 ; move down over board thickness.\n\
             G4            ; flush buffer.\n\
             M42 P6 S0     ; turn off suckage\n\
             G4            ; flush buffer.\n\
             M42 P8 S255   ; blow\n\
             G4 P40        ; .. for 40ms\n\
             M42 P8 S0     ; done.\n\
             G1 Z{z_up:<6.2}    ; Move up\n",
            name = format!("{} ({})", part.component_name, part.tape_key()),
            feed = (60.0 * PNP_TO_BOARD_SPEED) as i32,
            x = part.pos.x + origin.x,
            y = part.pos.y + origin.y,
            z_travel = travel_height,
            // The needle holds the component at the tape's native angle;
            // rotate by the difference to reach the declared orientation.
            e = PNP_ANGLE_FACTOR * (part.angle - tape.angle()).rem_euclid(360.0),
            z_down = tape.height() + board_thick - PNP_TAPE_THICK,
            z_up = travel_height,
        );
        self.send(&block)
    }

    fn dispense(&mut self, part: &Part, pad: &Pad) -> Result<()> {
        let origin = self.board_origin()?;
        let top = self.board_top()?;
        let pos = origin + part.pad_abs_pos(pad);
        let area = pad.area();
        let block = format!(
            "\n\
             ;; -- component {comp}, pad {pad}\n\
             G0 F{feed} X{x:.3} Y{y:.3} Z{z_hover:.3} ; move there.\n\
             G1 F{feed_down} Z{z_dispense:.2} ; Go down to dispense\n\
             M106      ; switch on fan (=solenoid)\n\
             G4 P{ms:<5.1} ; Wait time dependent on area {area:.2} mm^2\n\
             M107      ; switch off solenoid\n\
             G1 Z{z_separate:.2} ; high above to have paste separated\n",
            comp = part.component_name,
            pad = pad.name,
            feed = (60.0 * DISP_MOVE_SPEED) as i32,
            x = pos.x,
            y = pos.y,
            z_hover = top + DISP_Z_HOVER_ABOVE,
            feed_down = (60.0 * DISP_DISPENSE_SPEED) as i32,
            z_dispense = top + DISP_Z_DISPENSING_ABOVE,
            ms = self.timing.init_ms + area * self.timing.area_ms,
            area = area,
            z_separate = top + DISP_Z_SEPARATE_DROPLET_ABOVE,
        );
        self.send(&block)
    }

    fn finish(&mut self) -> Result<()> {
        self.send(
            "\n\
             G28 X0 Y0  ; Home x/y, but leave z clear\n\
             M84        ; stop motors\n",
        )
    }
}
