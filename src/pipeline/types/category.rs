use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Destination box for a picked object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBin {
    Left,
    Right,
}

impl SortBin {
    pub fn name(&self) -> &'static str {
        match self {
            SortBin::Left => "left",
            SortBin::Right => "right",
        }
    }
}

/// How the gripper rotation servo is driven for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Always the category's fixed rotation value.
    Fixed,
    /// Rotation follows the estimated object orientation.
    AngleAware,
}

/// Static per-label sorting profile. Read-only after configuration load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub bin: SortBin,
    pub rotation: RotationMode,
    pub fixed_rotation: u16,
}

/// Ordered label → profile map. Doubles as the detection whitelist: labels
/// absent from the map never survive target selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap(IndexMap<String, CategoryProfile>);

impl CategoryMap {
    pub fn new(entries: IndexMap<String, CategoryProfile>) -> Self {
        Self(entries)
    }

    pub fn profile(&self, label: &str) -> Option<&CategoryProfile> {
        self.0.get(&label.to_ascii_lowercase())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.profile(label).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CategoryProfile)> {
        self.0.iter()
    }
}
