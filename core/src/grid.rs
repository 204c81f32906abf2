//! Packed per-cell state store.
//!
//! Every cell holds four bytes, laid out row-major:
//!   offset 0: sun level      (re-rolled every tick)
//!   offset 1: water level    (accumulates, capped by the weather phase)
//!   offset 2: plant type     (0 = empty, otherwise catalog index + 1)
//!   offset 3: growth level   (0 = empty, 1..=MAX_GROWTH_LEVEL)
//!
//! RULE: The store never clamps. Callers keep values in range.
//! RULE: Out-of-range coordinates panic. Neighbor scans must go through
//!       `orthogonal_neighbors`, which only yields in-bounds cells.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

pub const BYTES_PER_CELL: usize = 4;
pub const MAX_GROWTH_LEVEL: u8 = 5;
/// Largest side length a grid may have; matches the scenario loader's cap.
pub const MAX_GRID_SIZE: usize = u16::MAX as usize;

const SUN: usize = 0;
const WATER: usize = 1;
const PLANT_TYPE: usize = 2;
const GROWTH_LEVEL: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridState {
    size:  usize,
    bytes: Vec<u8>,
}

/// Read-only copy of one cell's attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub sun:          u8,
    pub water:        u8,
    pub plant_type:   u8,
    pub growth_level: u8,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.plant_type == 0
    }
}

impl GridState {
    /// A zeroed grid of `size` × `size` cells. Panics on a zero size.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "grid size must be positive");
        Self {
            size,
            bytes: vec![0; size * size * BYTES_PER_CELL],
        }
    }

    /// Rebuild a grid from a raw byte buffer.
    pub fn from_bytes(size: usize, bytes: &[u8]) -> SimResult<Self> {
        if size == 0 {
            return Err(SimError::CorruptSnapshot {
                reason: "grid size is zero".into(),
            });
        }
        if size > MAX_GRID_SIZE {
            return Err(SimError::CorruptSnapshot {
                reason: format!("grid size {size} exceeds the maximum of {MAX_GRID_SIZE}"),
            });
        }
        let Some(expected) = size.checked_mul(size).and_then(|n| n.checked_mul(BYTES_PER_CELL)) else {
            return Err(SimError::CorruptSnapshot {
                reason: format!("a {size}x{size} grid does not fit in memory"),
            });
        };
        if bytes.len() != expected {
            return Err(SimError::CorruptSnapshot {
                reason: format!(
                    "grid buffer holds {} bytes, a {size}x{size} grid needs {expected}",
                    bytes.len()
                ),
            });
        }
        Ok(Self { size, bytes: bytes.to_vec() })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True if signed coordinates fall inside the grid.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    /// In-bounds orthogonal neighbors of (x, y), in the order
    /// left, right, up, down.
    pub fn orthogonal_neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
        let size = self.size;
        let (x, y) = (x as i64, y as i64);
        [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
            .into_iter()
            .filter(move |&(nx, ny)| nx >= 0 && ny >= 0 && (nx as usize) < size && (ny as usize) < size)
            .map(|(nx, ny)| (nx as usize, ny as usize))
    }

    fn index(&self, x: usize, y: usize, offset: usize) -> usize {
        assert!(
            x < self.size && y < self.size,
            "cell ({x}, {y}) is outside a {size}x{size} grid",
            size = self.size
        );
        (y * self.size + x) * BYTES_PER_CELL + offset
    }

    fn get(&self, x: usize, y: usize, offset: usize) -> u8 {
        self.bytes[self.index(x, y, offset)]
    }

    fn set(&mut self, x: usize, y: usize, offset: usize, value: u8) {
        let i = self.index(x, y, offset);
        self.bytes[i] = value;
    }

    pub fn sun(&self, x: usize, y: usize) -> u8 { self.get(x, y, SUN) }
    pub fn set_sun(&mut self, x: usize, y: usize, value: u8) { self.set(x, y, SUN, value) }

    pub fn water(&self, x: usize, y: usize) -> u8 { self.get(x, y, WATER) }
    pub fn set_water(&mut self, x: usize, y: usize, value: u8) { self.set(x, y, WATER, value) }

    pub fn plant_type(&self, x: usize, y: usize) -> u8 { self.get(x, y, PLANT_TYPE) }
    pub fn set_plant_type(&mut self, x: usize, y: usize, value: u8) { self.set(x, y, PLANT_TYPE, value) }

    pub fn growth_level(&self, x: usize, y: usize) -> u8 { self.get(x, y, GROWTH_LEVEL) }
    pub fn set_growth_level(&mut self, x: usize, y: usize, value: u8) { self.set(x, y, GROWTH_LEVEL, value) }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        let base = self.index(x, y, 0);
        Cell {
            sun:          self.bytes[base + SUN],
            water:        self.bytes[base + WATER],
            plant_type:   self.bytes[base + PLANT_TYPE],
            growth_level: self.bytes[base + GROWTH_LEVEL],
        }
    }

    /// All cells in row-major order (y outer, x inner).
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        let size = self.size;
        (0..size).flat_map(move |y| (0..size).map(move |x| (x, y, self.cell(x, y))))
    }

    /// Number of non-empty cells.
    pub fn plant_count(&self) -> usize {
        self.bytes
            .chunks_exact(BYTES_PER_CELL)
            .filter(|c| c[PLANT_TYPE] != 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_round_trip_every_attribute() {
        let mut grid = GridState::new(5);
        for (x, y) in [(0, 0), (4, 0), (2, 3), (4, 4)] {
            for value in [0u8, 1, 10, 255] {
                grid.set_sun(x, y, value);
                grid.set_water(x, y, value);
                grid.set_plant_type(x, y, value);
                grid.set_growth_level(x, y, value);
                assert_eq!(grid.sun(x, y), value);
                assert_eq!(grid.water(x, y), value);
                assert_eq!(grid.plant_type(x, y), value);
                assert_eq!(grid.growth_level(x, y), value);
            }
        }
    }

    #[test]
    fn attributes_are_independent() {
        let mut grid = GridState::new(3);
        grid.set_sun(1, 1, 7);
        grid.set_water(1, 1, 2);
        assert_eq!(grid.cell(1, 1), Cell { sun: 7, water: 2, plant_type: 0, growth_level: 0 });
        assert_eq!(grid.cell(0, 1), Cell::default());
        assert_eq!(grid.cell(2, 1), Cell::default());
    }

    #[test]
    fn layout_is_row_major_four_bytes_per_cell() {
        let mut grid = GridState::new(2);
        grid.set_growth_level(1, 0, 3);
        grid.set_sun(0, 1, 9);
        assert_eq!(grid.as_bytes()[7], 3);
        assert_eq!(grid.as_bytes()[8], 9);
    }

    #[test]
    #[should_panic(expected = "outside a 5x5 grid")]
    fn out_of_range_access_panics() {
        let grid = GridState::new(5);
        grid.sun(5, 0);
    }

    #[test]
    fn neighbors_are_filtered_to_the_grid() {
        let grid = GridState::new(3);
        let corner: Vec<_> = grid.orthogonal_neighbors(0, 0).collect();
        assert_eq!(corner, vec![(1, 0), (0, 1)]);
        assert_eq!(grid.orthogonal_neighbors(1, 1).count(), 4);
        assert!(!grid.contains(-1, 0));
        assert!(!grid.contains(0, 3));
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(GridState::from_bytes(2, &[0; 15]).is_err());
        assert!(GridState::from_bytes(0, &[]).is_err());
        let grid = GridState::from_bytes(2, &[1; 16]).unwrap();
        assert_eq!(grid.plant_count(), 4);
    }

    #[test]
    fn from_bytes_rejects_oversized_grid() {
        assert!(GridState::from_bytes(MAX_GRID_SIZE + 1, &[]).is_err());
        assert!(GridState::from_bytes(usize::MAX, &[]).is_err());
    }

    #[test]
    fn supports_single_cell_grid() {
        let mut grid = GridState::new(1);
        grid.set_plant_type(0, 0, 1);
        assert_eq!(grid.orthogonal_neighbors(0, 0).count(), 0);
        assert_eq!(grid.plant_count(), 1);
    }
}
