//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};

/// A simulation tick. One tick = one growing day.
pub type Tick = u64;

/// The canonical run identifier.
pub type RunId = String;

/// A player's position on the grid, in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

impl GridPos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Offset by (dx, dy). Returns None if the result would leave a grid of `size`.
    pub fn offset(&self, dx: i64, dy: i64, size: usize) -> Option<GridPos> {
        let nx = i64::try_from(self.x).ok()?.checked_add(dx)?;
        let ny = i64::try_from(self.y).ok()?.checked_add(dy)?;
        if nx < 0 || ny < 0 || nx >= size as i64 || ny >= size as i64 {
            return None;
        }
        Some(GridPos::new(nx as usize, ny as usize))
    }
}

/// A persistence slot. Numbered slots are player saves; `AutoSave` is reserved
/// for the per-tick autosave checked at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveSlot {
    Numbered(u8),
    AutoSave,
}

impl SaveSlot {
    /// Stable storage key for this slot.
    pub fn key(&self) -> String {
        match self {
            Self::Numbered(n) => format!("saveSlot{n}"),
            Self::AutoSave => "autoSave".to_string(),
        }
    }
}

impl std::fmt::Display for SaveSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numbered(n) => write!(f, "slot {n}"),
            Self::AutoSave => write!(f, "auto-save"),
        }
    }
}
