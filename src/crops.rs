//! Crop kinds and the per-session growth/harvest table.

use crate::game::EngineError;
use rand::Rng;

/// Crop kinds that can be planted on the farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropKind {
    Turnip,
    Apple,
    Pumpkin,
}

impl CropKind {
    /// Icon shown once the crop can be harvested.
    pub fn mature_icon(self) -> char {
        match self {
            Self::Turnip => 'T',
            Self::Apple => 'A',
            Self::Pumpkin => 'P',
        }
    }

    /// Icon shown while the crop is still growing.
    pub fn growing_icon(self) -> char {
        self.mature_icon().to_ascii_lowercase()
    }

    /// Index into theme colour arrays.
    pub fn color_index(self) -> usize {
        match self {
            Self::Turnip => 0,
            Self::Apple => 1,
            Self::Pumpkin => 2,
        }
    }
}

/// Growth time and harvest value for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropDefinition {
    pub kind: CropKind,
    /// Ticks after planting before the crop is mature.
    pub growth_ticks: u32,
    /// Base points for harvesting a pair.
    pub harvest_value: u32,
}

impl CropDefinition {
    pub const fn new(kind: CropKind, growth_ticks: u32, harvest_value: u32) -> Self {
        Self {
            kind,
            growth_ticks,
            harvest_value,
        }
    }
}

/// Ordered set of crops a session spawns from. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropTable {
    entries: Vec<CropDefinition>,
}

impl Default for CropTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CropTable {
    /// Turnip 2/10, Apple 3/20, Pumpkin 4/30.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                CropDefinition::new(CropKind::Turnip, 2, 10),
                CropDefinition::new(CropKind::Apple, 3, 20),
                CropDefinition::new(CropKind::Pumpkin, 4, 30),
            ],
        }
    }

    /// Build a custom table. Must be non-empty, with unique kinds and positive values.
    pub fn new(entries: Vec<CropDefinition>) -> Result<Self, EngineError> {
        if entries.is_empty() {
            return Err(EngineError::InvalidConfig("crop table is empty".into()));
        }
        for (i, def) in entries.iter().enumerate() {
            if def.growth_ticks == 0 || def.harvest_value == 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{:?} needs positive growth ticks and harvest value",
                    def.kind
                )));
            }
            if entries[..i].iter().any(|d| d.kind == def.kind) {
                return Err(EngineError::InvalidConfig(format!(
                    "{:?} listed twice",
                    def.kind
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, kind: CropKind) -> Option<&CropDefinition> {
        self.entries.iter().find(|d| d.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CropDefinition> {
        self.entries.iter()
    }

    /// True once `growth` reaches the kind's growth time. Unknown kinds never mature.
    pub fn is_mature(&self, kind: CropKind, growth: u32) -> bool {
        self.get(kind).is_some_and(|d| growth >= d.growth_ticks)
    }

    /// Uniformly random kind from the table.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> CropKind {
        self.entries[rng.random_range(0..self.entries.len())].kind
    }
}
