//! Bill-of-materials summary of a board.

use pnpkit_core::Board;
use std::collections::BTreeMap;

/// One component type on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BomEntry {
    /// `<footprint>@<value>`, the tape lookup key.
    pub key: String,
    /// Component references using this type, in board order.
    pub components: Vec<String>,
}

impl BomEntry {
    pub fn count(&self) -> usize {
        self.components.len()
    }
}

/// Group the board's parts by component type, sorted by key.
pub fn bill_of_materials(board: &Board) -> Vec<BomEntry> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for part in board.parts() {
        grouped
            .entry(part.tape_key())
            .or_default()
            .push(part.component_name.clone());
    }
    grouped
        .into_iter()
        .map(|(key, components)| BomEntry { key, components })
        .collect()
}
