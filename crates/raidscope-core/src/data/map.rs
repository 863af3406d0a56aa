use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Which faction an extract is open to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitSide {
    Pmc,
    Scav,
    Shared,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractEntry {
    pub name: String,
    pub position: Vec3,
    #[serde(default)]
    pub sides: Vec<ExitSide>,
}

/// A transit point to another map; open to everyone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitEntry {
    pub name: String,
    pub position: Vec3,
}

/// A static environmental hazard (minefield, sniper lane, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardEntry {
    pub kind: String,
    pub position: Vec3,
}

/// Static reference data for one map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEntry {
    pub id: String,
    pub name: String,
    /// The armored vehicle patrols only some maps.
    #[serde(default)]
    pub has_vehicle: bool,
    #[serde(default)]
    pub extracts: Vec<ExtractEntry>,
    #[serde(default)]
    pub transits: Vec<TransitEntry>,
    #[serde(default)]
    pub hazards: Vec<HazardEntry>,
}
