//! Snapshots: full simulation state as a value, the undo/redo history
//! and the compressed save codec.
//!
//! A snapshot is built field by field from the live session: the grid
//! buffer is copied, primitives are copied by value, and the plant list is
//! derived by scanning the grid (never stored independently).
//!
//! Save payload: camelCase JSON of SimulationState, LZ4-compressed with the
//! uncompressed size prepended.

use crate::{
    error::{SimError, SimResult},
    grid::{GridState, MAX_GROWTH_LEVEL},
    plant::PlantCatalog,
    types::{GridPos, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantRecord {
    pub x: usize,
    pub y: usize,
    pub plant_type: u8,
    pub growth_level: u8,
    pub water_level: u8,
    pub sun_level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub grid_state: Vec<u8>,
    pub game_time: Tick,
    pub grid_size: usize,
    pub player_position: GridPos,
    pub plants: Vec<PlantRecord>,
    pub scenario_name: Option<String>,
    #[serde(default)]
    pub scenario_completed: bool,
}

impl SimulationState {
    pub fn capture(
        grid: &GridState,
        tick: Tick,
        player: GridPos,
        scenario_name: Option<&str>,
        scenario_completed: bool,
    ) -> Self {
        Self {
            grid_state: grid.as_bytes().to_vec(),
            game_time: tick,
            grid_size: grid.size(),
            player_position: player,
            plants: collect_plants(grid),
            scenario_name: scenario_name.map(str::to_string),
            scenario_completed,
        }
    }

    /// Rebuild the grid this snapshot describes.
    ///
    /// The byte buffer is authoritative for shape; the plant list is replayed
    /// on top so both sources agree. A disagreement is logged, not fatal.
    /// Every occupied cell must hold a catalog plant at a living growth
    /// level, and every empty cell must have growth 0.
    pub fn rebuild_grid(&self, catalog: &PlantCatalog) -> SimResult<GridState> {
        let mut grid = GridState::from_bytes(self.grid_size, &self.grid_state)?;
        if self.player_position.x >= self.grid_size || self.player_position.y >= self.grid_size {
            return Err(SimError::CorruptSnapshot {
                reason: format!(
                    "player position ({}, {}) is outside the {size}x{size} grid",
                    self.player_position.x,
                    self.player_position.y,
                    size = self.grid_size
                ),
            });
        }
        if collect_plants(&grid) != self.plants {
            log::warn!("Snapshot plant list disagrees with grid bytes; replaying plant list");
        }
        for p in &self.plants {
            if p.x >= self.grid_size || p.y >= self.grid_size {
                return Err(SimError::CorruptSnapshot {
                    reason: format!("plant at ({}, {}) is outside the grid", p.x, p.y),
                });
            }
            grid.set_plant_type(p.x, p.y, p.plant_type);
            grid.set_growth_level(p.x, p.y, p.growth_level);
            grid.set_water(p.x, p.y, p.water_level);
            grid.set_sun(p.x, p.y, p.sun_level);
        }
        for (x, y, cell) in grid.cells() {
            let consistent = if cell.is_empty() {
                cell.growth_level == 0
            } else {
                catalog.contains(cell.plant_type) && (1..=MAX_GROWTH_LEVEL).contains(&cell.growth_level)
            };
            if !consistent {
                return Err(SimError::CorruptSnapshot {
                    reason: format!(
                        "cell ({x}, {y}) holds plant type {} at growth {}",
                        cell.plant_type, cell.growth_level
                    ),
                });
            }
        }
        Ok(grid)
    }

    /// Serialize and compress for slot storage.
    pub fn encode(&self) -> SimResult<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        Ok(lz4_flex::compress_prepend_size(&json))
    }

    pub fn decode(bytes: &[u8]) -> SimResult<Self> {
        let json = lz4_flex::decompress_size_prepended(bytes)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Every non-empty cell, row-major.
pub fn collect_plants(grid: &GridState) -> Vec<PlantRecord> {
    grid.cells()
        .filter(|(_, _, c)| !c.is_empty())
        .map(|(x, y, c)| PlantRecord {
            x,
            y,
            plant_type: c.plant_type,
            growth_level: c.growth_level,
            water_level: c.water,
            sun_level: c.sun,
        })
        .collect()
}

/// Linear undo/redo history.
///
/// The newest entry of the undo stack is always the state the session is
/// currently showing; undo steps back to the entry beneath it. The stack
/// keeps `max_steps` earlier states on top of that live entry; pushing past
/// the bound drops the oldest.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    undo:      VecDeque<SimulationState>,
    redo:      Vec<SimulationState>,
    max_steps: usize,
}

impl UndoHistory {
    pub fn new(max_steps: usize) -> Self {
        let max_steps = max_steps.max(1);
        Self {
            undo: VecDeque::with_capacity(max_steps + 1),
            redo: Vec::new(),
            max_steps,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// How many undo steps are available right now.
    pub fn undo_depth(&self) -> usize {
        self.undo.len().saturating_sub(1)
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Record a new post-action state. Clears the redo stack.
    pub fn push(&mut self, state: SimulationState) {
        self.undo.push_back(state);
        self.redo.clear();
        self.evict();
    }

    /// Step back. `current` goes onto the redo stack; the returned state is
    /// what the session must restore. None when there is nothing earlier.
    pub fn undo(&mut self, current: SimulationState) -> Option<SimulationState> {
        if self.undo.len() < 2 {
            return None;
        }
        self.undo.pop_back();
        self.redo.push(current);
        self.undo.back().cloned()
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, _current: SimulationState) -> Option<SimulationState> {
        let next = self.redo.pop()?;
        self.undo.push_back(next.clone());
        self.evict();
        Some(next)
    }

    fn evict(&mut self) {
        while self.undo.len() > self.max_steps + 1 {
            self.undo.pop_front();
        }
    }
}
