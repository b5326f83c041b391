use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Partial overlay configuration selected by the `state` parameter.
///
/// Only visibility is carried today. New optional fields can be added without
/// breaking existing tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePreset {
    #[serde(default)]
    pub visible: Option<bool>,
}

impl StatePreset {
    pub const fn visible(visible: bool) -> Self {
        Self {
            visible: Some(visible),
        }
    }
}

/// Read-only table of presets keyed by their numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetTable {
    presets: BTreeMap<u32, StatePreset>,
}

impl Default for PresetTable {
    fn default() -> Self {
        [
            (1, StatePreset::visible(true)),
            (2, StatePreset::visible(true)),
            (3, StatePreset::visible(true)),
            (4, StatePreset::visible(false)),
        ]
        .into_iter()
        .collect()
    }
}

impl FromIterator<(u32, StatePreset)> for PresetTable {
    fn from_iter<I: IntoIterator<Item = (u32, StatePreset)>>(iter: I) -> Self {
        Self {
            presets: iter.into_iter().collect(),
        }
    }
}

impl PresetTable {
    pub fn get(&self, id: u32) -> Option<&StatePreset> {
        self.presets.get(&id)
    }

    /// Looks up the visibility opinion of the preset named by a raw `state`
    /// value. The id must be written in canonical decimal form (`"4"`, not
    /// `"04"`). Unknown ids have no opinion.
    pub fn resolve(&self, state: &str) -> Option<bool> {
        let id: u32 = state.parse().ok()?;
        if id.to_string() != state {
            return None;
        }
        self.get(id).and_then(|preset| preset.visible)
    }
}
