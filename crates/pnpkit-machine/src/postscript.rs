//! PostScript preview backend.
//!
//! Renders the same operations as vector drawing instead of motion: a
//! job can be validated on paper (or a viewer) before it is committed to
//! hardware. No configuration is required; without one the board is
//! drawn at the bed origin.

use crate::machine::Machine;
use pnpkit_config::PnPConfig;
use pnpkit_core::{Dimension, Pad, Part, Result, Tape};
use std::collections::HashSet;
use std::io::Write;

const DISPENSE_PART_COLOR: &str = "0.8 0.8 0.8";
const PICK_COLOR: &str = "0 0 0";
const PLACE_COLOR: &str = "0 0 0";
const PLACE_MISSING_PART: &str = "1 0.3 0";

const MM_TO_POINT: f32 = 72.0 / 25.4;

const PS_PREAMBLE: &str = r#"% <width> <height> <x0> <y0>
/rect {
  moveto
  1 index 0 rlineto
  0 exch rlineto
  neg 0 rlineto
  closepath
  stroke
} def

/fillrect {
  moveto
  1 index 0 rlineto
  0 exch rlineto
  neg 0 rlineto
  closepath
  fill
} def

% x y
/showmark {
  gsave
  translate
  0 0 1 setrgbcolor
  45 rotate
  0 0 moveto
  -3 0 rmoveto 6 0 rlineto stroke
  0 0 moveto
  0 -3 rmoveto 0 6 rlineto stroke
  0  0 1 0 360 arc stroke
  grestore
} def

% print component
% <width> <height>  <x0> <y0> <r> <g> <b> <name> <angle> <x> <y> pc
/pc {
    gsave
    translate              % takes <x> <y>
    rotate                 % takes <angle>
    0 0 moveto
    0 0 0.1 0 360 arc      % mark center with tiny dot.
    0 0 1 setrgbcolor show % takes <name>
    setrgbcolor            % takes <r><g><b>
    rect                   % take <dy> <dx> <x0> <y0>
    grestore
} def

% PastePad.
% Stack: <diameter>
/pp { 0.2 setlinewidth 0 360 arc stroke } def

% Move, show path.
% Stack: <x> <y>
/m {
  0 0.5 0 setrgbcolor
  0 setlinewidth lineto
  currentpoint        % leave the new point on the stack
  stroke
  0 0 0 setrgbcolor
} def

72.0 25.4 div dup scale                  % Switch to mm
0.05 setlinewidth
/Helvetica findfont 1.5 scalefont setfont  % Small font
"#;

/// Machine backend that draws the job instead of running it.
pub struct PostScriptMachine<W: Write> {
    out: W,
    config: PnPConfig,
    /// Parts whose outline was already drawn during dispensing.
    dispense_parts_printed: HashSet<String>,
}

impl<W: Write> PostScriptMachine<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            config: PnPConfig::default(),
            dispense_parts_printed: HashSet::new(),
        }
    }

    /// Hand back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Draw the pads of a part, translated and rotated into place.
    fn print_pads(&mut self, part: &Part, offset_x: f32, offset_y: f32, angle: f32) -> Result<()> {
        writeln!(self.out, "%pads")?;
        writeln!(
            self.out,
            "gsave\n {:.3} {:.3} translate {:.3} rotate",
            offset_x, offset_y, angle
        )?;
        for (padnum, pad) in part.pads.iter().enumerate() {
            writeln!(self.out, " 0.7 0.9 0 setrgbcolor")?;
            writeln!(
                self.out,
                " {:.3} {:.3} {:.3} {:.3} fillrect",
                pad.size.w,
                pad.size.h,
                pad.pos.x - pad.size.w / 2.0,
                pad.pos.y - pad.size.h / 2.0
            )?;
            writeln!(self.out, " 0 0 0 setrgbcolor")?;
            writeln!(
                self.out,
                " {:.3} {:.3} moveto ({}) show stroke",
                pad.pos.x - pad.size.w / 2.0,
                pad.pos.y - pad.size.h / 2.0,
                padnum + 1
            )?;
        }
        writeln!(self.out, " stroke\ngrestore")?;
        Ok(())
    }

    /// Draw the component glyph: rotated bounding box, center dot, name.
    fn print_component(&mut self, part: &Part, color: &str, angle: f32, x: f32, y: f32) -> Result<()> {
        writeln!(
            self.out,
            "{:.3} {:.3}   {:.3} {:.3} {} ({}) {:.3} {:.3} {:.3} pc",
            part.bounding_box.width(),
            part.bounding_box.height(),
            part.bounding_box.p0.x,
            part.bounding_box.p0.y,
            color,
            part.component_name,
            angle,
            x,
            y
        )?;
        Ok(())
    }
}

impl<W: Write> Machine for PostScriptMachine<W> {
    fn init(
        &mut self,
        config: Option<&PnPConfig>,
        init_comment: &str,
        board: &Dimension,
    ) -> Result<()> {
        if let Some(config) = config {
            self.config = config.clone();
        }
        self.dispense_parts_printed.clear();

        // Without tapes only the board is of interest; otherwise show the
        // whole bed so the feeders are visible too.
        if self.config.tape_for_component.is_empty() {
            writeln!(
                self.out,
                "%!PS-Adobe-3.0\n%%BoundingBox: {:.0} {:.0} {:.0} {:.0}\n",
                self.config.board.origin.x * MM_TO_POINT,
                self.config.board.origin.y * MM_TO_POINT,
                board.w * MM_TO_POINT,
                board.h * MM_TO_POINT
            )?;
        } else {
            writeln!(
                self.out,
                "%!PS-Adobe-3.0\n%%BoundingBox: 0 0 {:.0} {:.0}\n",
                300.0 * MM_TO_POINT,
                300.0 * MM_TO_POINT
            )?;
        }
        writeln!(self.out, "% {}", init_comment)?;
        write!(self.out, "{}", PS_PREAMBLE)?;

        // Board outline and origin marker.
        writeln!(
            self.out,
            "{:.1} {:.1} {:.1} {:.1} rect",
            board.w, board.h, self.config.board.origin.x, self.config.board.origin.y
        )?;
        writeln!(
            self.out,
            "{:.1} {:.1} showmark",
            self.config.board.origin.x, self.config.board.origin.y
        )?;
        // The dispense path draws lines from the current point.
        writeln!(self.out, "0 0 moveto")?;
        Ok(())
    }

    fn pick_part(&mut self, part: &Part, tape: Option<&Tape>) -> Result<()> {
        let Some(tape) = tape else {
            return Ok(());
        };
        // Peek only; the preview must not consume feeder state.
        if let Some((tx, ty, _)) = tape.pos() {
            let angle = tape.angle();
            self.print_pads(part, tx, ty, angle)?;
            self.print_component(part, PICK_COLOR, angle, tx, ty)?;
        }
        Ok(())
    }

    fn place_part(&mut self, part: &Part, tape: Option<&Tape>) -> Result<()> {
        let x = self.config.board.origin.x + part.pos.x;
        let y = self.config.board.origin.y + part.pos.y;
        self.print_pads(part, x, y, part.angle)?;

        // Parts whose tape is missing or exhausted are still shown, in a
        // warning color.
        let color = match tape {
            Some(tape) if tape.parts_available() => PLACE_COLOR,
            _ => PLACE_MISSING_PART,
        };
        self.print_component(part, color, part.angle, x, y)
    }

    fn dispense(&mut self, part: &Part, pad: &Pad) -> Result<()> {
        if !self.dispense_parts_printed.contains(&part.component_name) {
            let x = self.config.board.origin.x + part.pos.x;
            let y = self.config.board.origin.y + part.pos.y;
            self.print_component(part, DISPENSE_PART_COLOR, part.angle, x, y)?;
            self.dispense_parts_printed
                .insert(part.component_name.clone());
        }

        let pos = self.config.board.origin + part.pad_abs_pos(pad);
        let radius = (pad.area() / std::f32::consts::PI).sqrt();
        writeln!(
            self.out,
            "{:.3} {:.3} m {:.3} pp \n{:.3} {:.3} moveto",
            pos.x, pos.y, radius, pos.x, pos.y
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.out, "showpage")?;
        Ok(())
    }
}
