//! Static environmental hazards for the current map.
//!
//! Pure reference data; built once at session start. Dynamic hazards
//! (grenades, tripwires) live in the explosives catalog instead.

use crate::data::{DataRegistry, HazardEntry};

pub struct HazardList {
    entries: Vec<HazardEntry>,
}

impl HazardList {
    pub(crate) fn build(data: &DataRegistry, map_id: &str) -> Self {
        let entries = data.map(map_id).map(|map| map.hazards.clone()).unwrap_or_default();
        Self { entries }
    }

    pub fn entries(&self) -> &[HazardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
