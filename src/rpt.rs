//! KiCad `.rpt` footprint report loader.
//!
//! A crude whitespace-token parser over the report format: `$MODULE` /
//! `$PAD` blocks with `position`, `size`, `orientation`, `drill`,
//! `value`, `footprint` and `layer` records. Unknown tokens are skipped.
//! Through-hole modules (any drilled pad) are excluded; this machine
//! only handles SMT. All coordinates are converted to mm.

use anyhow::{anyhow, Context, Result};
use pnpkit_core::{Board, BoundingBox, Dimension, Pad, Part, Position};
use std::path::Path;
use tracing::info;

/// Load a board from a `.rpt` file.
pub fn load_rpt(path: &Path) -> Result<Board> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read board report {}", path.display()))?;
    let board = parse_rpt(&text)?;
    info!(
        "Loaded {} parts from {}",
        board.part_count(),
        path.display()
    );
    Ok(board)
}

struct Tokens<'a> {
    iter: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace(),
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        self.iter.next()
    }

    fn next_value(&mut self) -> Result<&'a str> {
        let token = self
            .iter
            .next()
            .ok_or_else(|| anyhow!("Unexpected end of board report"))?;
        // Some exports write "key = value".
        if token == "=" {
            return self
                .iter
                .next()
                .ok_or_else(|| anyhow!("Unexpected end of board report"));
        }
        Ok(token)
    }

    fn next_f32(&mut self) -> Result<f32> {
        let token = self.next_value()?;
        token
            .parse()
            .with_context(|| format!("Not a number in board report: '{}'", token))
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches('"')
}

#[derive(Default)]
struct PartBuilder {
    name: String,
    value: String,
    footprint: String,
    pos: Option<Position>,
    angle: Option<f32>,
    front: bool,
    size: Option<Dimension>,
    pads: Vec<Pad>,
    drill_sum: f32,
}

impl PartBuilder {
    fn build(self) -> Option<Part> {
        // Any drilled pad makes this a through-hole part.
        if self.drill_sum > 0.0 {
            return None;
        }
        let bounding_box = match self.size {
            Some(size) => BoundingBox::new(
                Position::new(-size.w / 2.0, -size.h / 2.0),
                Position::new(size.w / 2.0, size.h / 2.0),
            ),
            None => pad_extent(&self.pads),
        };
        Some(Part {
            component_name: self.name,
            value: self.value,
            footprint: self.footprint,
            pos: self.pos.unwrap_or_default(),
            angle: self.angle.unwrap_or(0.0),
            front_layer: self.front,
            pads: self.pads,
            bounding_box,
        })
    }
}

fn pad_extent(pads: &[Pad]) -> BoundingBox {
    let mut bbox = BoundingBox::default();
    for pad in pads {
        bbox.p0.x = bbox.p0.x.min(pad.pos.x - pad.size.w / 2.0);
        bbox.p0.y = bbox.p0.y.min(pad.pos.y - pad.size.h / 2.0);
        bbox.p1.x = bbox.p1.x.max(pad.pos.x + pad.size.w / 2.0);
        bbox.p1.y = bbox.p1.y.max(pad.pos.y + pad.size.h / 2.0);
    }
    bbox
}

#[derive(Default)]
struct PadBuilder {
    name: String,
    pos: Position,
    size: Dimension,
    drill: f32,
}

/// Parse the report text into a board.
pub fn parse_rpt(text: &str) -> Result<Board> {
    let mut tokens = Tokens::new(text);
    let mut conversion = 1.0f32;
    let mut parts: Vec<Part> = Vec::new();
    let mut part: Option<PartBuilder> = None;
    let mut pad: Option<PadBuilder> = None;

    while let Some(token) = tokens.next() {
        match token {
            "unit" => {
                let unit = tokens.next_value()?;
                if unit.to_ascii_uppercase().starts_with("INCH") {
                    conversion = 25.4;
                }
            }
            "$MODULE" => {
                let name = unquote(tokens.next_value()?);
                part = Some(PartBuilder {
                    name: name.to_string(),
                    front: true,
                    ..PartBuilder::default()
                });
            }
            "$EndMODULE" => {
                if let Some(done) = part.take() {
                    parts.extend(done.build());
                }
            }
            "$PAD" => {
                let name = unquote(tokens.next_value()?);
                pad = Some(PadBuilder {
                    name: name.to_string(),
                    ..PadBuilder::default()
                });
            }
            "$EndPAD" => {
                if let (Some(done), Some(part)) = (pad.take(), part.as_mut()) {
                    part.drill_sum += done.drill;
                    if done.drill == 0.0 {
                        part.pads.push(Pad {
                            name: done.name,
                            pos: done.pos,
                            size: done.size,
                        });
                    }
                }
            }
            "position" => {
                let x = tokens.next_f32()? * conversion;
                let y = tokens.next_f32()? * conversion;
                if let Some(pad) = pad.as_mut() {
                    // Pad positions are module-relative and unrotated;
                    // the part rotation is applied when they are used.
                    pad.pos = Position::new(x, y);
                } else if let Some(part) = part.as_mut() {
                    if part.pos.is_none() {
                        part.pos = Some(Position::new(x, y));
                    }
                }
            }
            "size" => {
                let w = tokens.next_f32()? * conversion;
                let h = tokens.next_f32()? * conversion;
                if let Some(pad) = pad.as_mut() {
                    pad.size = Dimension::new(w, h);
                } else if let Some(part) = part.as_mut() {
                    if part.size.is_none() {
                        part.size = Some(Dimension::new(w, h));
                    }
                }
            }
            "drill" => {
                let drill = tokens.next_f32()? * conversion;
                if let Some(pad) = pad.as_mut() {
                    pad.drill = drill;
                }
            }
            "orientation" => {
                let angle = tokens.next_f32()?;
                if pad.is_none() {
                    if let Some(part) = part.as_mut() {
                        if part.angle.is_none() {
                            part.angle = Some(angle);
                        }
                    }
                }
            }
            "value" => {
                let value = unquote(tokens.next_value()?);
                if let Some(part) = part.as_mut() {
                    part.value = value.to_string();
                }
            }
            "footprint" => {
                let footprint = unquote(tokens.next_value()?);
                if let Some(part) = part.as_mut() {
                    part.footprint = footprint.to_string();
                }
            }
            "reference" => {
                let name = unquote(tokens.next_value()?);
                if let Some(part) = part.as_mut() {
                    part.name = name.to_string();
                }
            }
            "layer" => {
                let layer = tokens.next_value()?.to_ascii_lowercase();
                if let Some(part) = part.as_mut() {
                    part.front = layer.contains("front") || layer.contains("component");
                }
            }
            _ => {} // crude parser: anything else is skipped
        }
    }

    let dimension = board_extent(&parts);
    Ok(Board::new(dimension, parts))
}

/// The board outline is not in the report; use the extent of the parts.
fn board_extent(parts: &[Part]) -> Dimension {
    let mut dim = Dimension::default();
    for part in parts {
        dim.w = dim.w.max(part.pos.x + part.bounding_box.p1.x);
        dim.h = dim.h.max(part.pos.y + part.bounding_box.p1.y);
    }
    dim
}
