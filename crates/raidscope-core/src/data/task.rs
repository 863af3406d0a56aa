use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// A named location an objective points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskZone {
    pub id: String,
    pub map: String,
    pub position: Vec3,
}

/// One objective of a task. The id matches the remote condition id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskObjective {
    pub id: String,
    #[serde(default)]
    pub required_items: Vec<String>,
    #[serde(default)]
    pub zones: Vec<TaskZone>,
}

/// A task (quest) definition from the reference database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub objectives: Vec<TaskObjective>,
}
