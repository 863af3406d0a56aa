//! Extraction points and transits for the current map.
//!
//! Built once at session start, filtered to what the local player can
//! actually use: PMCs see pmc and shared extracts, scavs see scav and
//! shared. Transits are open to everyone.

use crate::data::{DataRegistry, ExitSide, ExtractEntry, TransitEntry};
use crate::raid::player::PlayerSide;

pub struct ExitList {
    extracts: Vec<ExtractEntry>,
    transits: Vec<TransitEntry>,
}

impl ExitList {
    pub(crate) fn build(data: &DataRegistry, map_id: &str, side: PlayerSide) -> Self {
        let map = match data.map(map_id) {
            Some(map) => map,
            None => return Self { extracts: Vec::new(), transits: Vec::new() },
        };
        let own = if side.is_pmc() { ExitSide::Pmc } else { ExitSide::Scav };
        let extracts = map
            .extracts
            .iter()
            .filter(|e| e.sides.contains(&own) || e.sides.contains(&ExitSide::Shared))
            .cloned()
            .collect();
        Self { extracts, transits: map.transits.clone() }
    }

    pub fn extracts(&self) -> &[ExtractEntry] {
        &self.extracts
    }

    pub fn transits(&self) -> &[TransitEntry] {
        &self.transits
    }

    pub fn is_empty(&self) -> bool {
        self.extracts.is_empty() && self.transits.is_empty()
    }
}
