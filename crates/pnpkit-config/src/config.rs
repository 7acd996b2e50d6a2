//! The `PnPConfig`: everything the machine backends need to know about
//! the physical setup that is not in the board file.
//!
//! One tape can feed several component keys; the map therefore holds
//! shared handles, never copies. Constructed once per run, read by the
//! schedulers and backends, mutated only by the jog calibration.

use crate::error::ConfigFileError;
use pnpkit_core::{Board, ConfigError, Position, SharedTape, Tape};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::rc::Rc;
use tracing::{info, warn};

/// Where the board sits on the machine bed.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoardConfig {
    /// Bed position of the board's lower-left corner.
    pub origin: Position,
    /// Absolute height of the board's top surface.
    pub top: f32,
}

/// The complete machine setup for a run.
#[derive(Debug, Default, Clone)]
pub struct PnPConfig {
    pub board: BoardConfig,
    /// The machine's physical reference Z; board thickness is
    /// `board.top - bed_level`.
    pub bed_level: f32,
    /// Feeder lookup by `<footprint>@<value>`.
    pub tape_for_component: HashMap<String, SharedTape>,
}

impl PnPConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<PnPConfig, ConfigFileError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(
            "Configuration: board origin {}, {} tape keys",
            config.board.origin,
            config.tape_for_component.len()
        );
        Ok(config)
    }

    /// Parse and validate configuration TOML.
    pub fn from_toml_str(text: &str) -> Result<PnPConfig, ConfigFileError> {
        let file: ConfigFile = toml::from_str(text)?;

        let mut tape_for_component = HashMap::new();
        for section in &file.tape {
            if section.spacing == [0.0, 0.0] {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "tape for {:?}: at least one spacing component must be set",
                        section.components
                    ),
                }
                .into());
            }
            let mut tape = Tape::new();
            tape.set_first_component_position(
                section.origin[0],
                section.origin[1],
                section.origin[2],
            );
            tape.set_component_spacing(section.spacing[0], section.spacing[1]);
            tape.set_angle(section.angle);
            tape.set_slant_angle(section.slant);
            tape.set_number_components(section.count);

            let tape: SharedTape = Rc::new(RefCell::new(tape));
            for key in &section.components {
                if tape_for_component
                    .insert(key.clone(), Rc::clone(&tape))
                    .is_some()
                {
                    warn!("Component key '{}' assigned to more than one tape; last one wins", key);
                }
            }
        }

        let config = PnPConfig {
            board: BoardConfig {
                origin: Position::new(file.board.origin[0], file.board.origin[1]),
                top: file.board.top,
            },
            bed_level: file.bed_level,
            tape_for_component,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the height invariants: the bed level may never be above the
    /// board top or above any tape surface.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bed_level > self.board.top {
            return Err(ConfigError::BedAboveBoard {
                bed_level: self.bed_level,
                board_top: self.board.top,
            });
        }
        for (key, tape) in &self.tape_for_component {
            let tape_height = tape.borrow().height();
            if self.bed_level > tape_height {
                return Err(ConfigError::BedAboveTape {
                    key: key.clone(),
                    bed_level: self.bed_level,
                    tape_height,
                });
            }
        }
        Ok(())
    }

    /// Find the tape feeding a component key.
    pub fn tape_for(&self, key: &str) -> Option<SharedTape> {
        self.tape_for_component.get(key).cloned()
    }
}

/// On-disk representation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFile {
    board: BoardSection,
    bed_level: f32,
    #[serde(default)]
    tape: Vec<TapeSection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BoardSection {
    origin: [f32; 2],
    top: f32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TapeSection {
    /// All `<footprint>@<value>` keys this feeder supplies.
    components: Vec<String>,
    /// First component position: x, y, z.
    origin: [f32; 3],
    spacing: [f32; 2],
    #[serde(default)]
    angle: f32,
    #[serde(default)]
    slant: f32,
    count: u32,
}

/// Emit a configuration skeleton for `board`: one `[[tape]]` block per
/// distinct component type, positions left for the operator to fill in.
pub fn config_template(board: &Board) -> String {
    let mut per_key: BTreeMap<String, usize> = BTreeMap::new();
    for part in board.parts() {
        *per_key.entry(part.tape_key()).or_insert(0) += 1;
    }

    let mut out = String::new();
    out.push_str("# PnPKit machine configuration.\n");
    out.push_str("# All lengths in mm, angles in degrees.\n\n");
    out.push_str("[board]\n");
    out.push_str("origin = [100.0, 100.0]  # bed position of the board corner\n");
    out.push_str("top = 0.0                # height of the board top surface\n\n");
    out.push_str("bed-level = 0.0\n");
    for (key, count) in &per_key {
        out.push_str("\n[[tape]]\n");
        out.push_str(&format!("components = [\"{}\"]\n", key));
        out.push_str("origin = [0.0, 0.0, 0.0]  # first component x y z\n");
        out.push_str("spacing = [4.0, 0.0]\n");
        out.push_str("angle = 0.0\n");
        out.push_str("slant = 0.0\n");
        out.push_str(&format!("count = {}  # parts needed on the board\n", count));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
[board]
origin = [100.0, 50.0]
top = 12.0

bed-level = 11.0

[[tape]]
components = ["0805@100n", "0805@10k"]
origin = [250.0, 20.0, 12.5]
spacing = [4.0, 0.0]
slant = 90.0
count = 40

[[tape]]
components = ["SOT23@BC847"]
origin = [250.0, 40.0, 13.0]
spacing = [0.0, 4.0]
count = 10
"#;

    #[test]
    fn test_parse_example() {
        let config = PnPConfig::from_toml_str(EXAMPLE).unwrap();
        assert_eq!(config.board.origin, Position::new(100.0, 50.0));
        assert_eq!(config.board.top, 12.0);
        assert_eq!(config.bed_level, 11.0);
        assert_eq!(config.tape_for_component.len(), 3);

        let tape = config.tape_for("0805@100n").unwrap();
        assert_eq!(tape.borrow().pos(), Some((250.0, 20.0, 12.5)));
        assert_eq!(tape.borrow().angle(), 90.0);
    }

    #[test]
    fn test_keys_share_one_tape() {
        let config = PnPConfig::from_toml_str(EXAMPLE).unwrap();
        let a = config.tape_for("0805@100n").unwrap();
        let b = config.tape_for("0805@10k").unwrap();
        assert!(Rc::ptr_eq(&a, &b));

        // Consuming through one key is visible through the other.
        a.borrow_mut().advance();
        assert_eq!(b.borrow().pos(), Some((254.0, 20.0, 12.5)));
    }

    #[test]
    fn test_bed_above_board_rejected() {
        let text = "[board]\norigin = [0.0, 0.0]\ntop = 10.0\n\nbed-level = 10.5\n";
        let err = PnPConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Invalid(ConfigError::BedAboveBoard { .. })
        ));
    }

    #[test]
    fn test_bed_above_tape_rejected() {
        let text = r#"
[board]
origin = [0.0, 0.0]
top = 12.0

bed-level = 11.0

[[tape]]
components = ["0805@1k"]
origin = [10.0, 10.0, 10.5]
spacing = [4.0, 0.0]
count = 5
"#;
        let err = PnPConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Invalid(ConfigError::BedAboveTape { .. })
        ));
    }

    #[test]
    fn test_zero_spacing_rejected() {
        let text = r#"
[board]
origin = [0.0, 0.0]
top = 12.0

bed-level = 11.0

[[tape]]
components = ["0805@1k"]
origin = [10.0, 10.0, 12.0]
spacing = [0.0, 0.0]
count = 5
"#;
        let err = PnPConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Invalid(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();
        let config = PnPConfig::load(file.path()).unwrap();
        assert_eq!(config.tape_for_component.len(), 3);
    }

    #[test]
    fn test_template_lists_component_keys() {
        use pnpkit_core::{BoundingBox, Dimension, Pad, Part};

        let part = |name: &str, footprint: &str, value: &str| Part {
            component_name: name.to_string(),
            value: value.to_string(),
            footprint: footprint.to_string(),
            pos: Position::default(),
            angle: 0.0,
            front_layer: true,
            pads: vec![Pad {
                name: "1".to_string(),
                pos: Position::default(),
                size: Dimension::new(1.0, 1.0),
            }],
            bounding_box: BoundingBox::default(),
        };
        let board = Board::new(
            Dimension::new(50.0, 50.0),
            vec![
                part("R1", "0805", "10k"),
                part("R2", "0805", "10k"),
                part("C1", "0603", "100n"),
            ],
        );

        let template = config_template(&board);
        assert!(template.contains("components = [\"0805@10k\"]"));
        assert!(template.contains("components = [\"0603@100n\"]"));
        assert!(template.contains("count = 2"));
        // A template must itself parse once the operator fills it in.
        assert!(PnPConfig::from_toml_str(&template).is_ok());
    }
}
