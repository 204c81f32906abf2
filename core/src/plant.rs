//! Plant catalog: growth predicates and special abilities.
//!
//! A plant type is identified on the grid by `catalog index + 1`
//! (0 is reserved for "empty"). The catalog is built once at session
//! start and never mutated afterwards.
//!
//! Growth predicates and abilities are plain functions of the grid.
//! They see the grid exactly as it is at evaluation time, including any
//! changes already made by cells earlier in the same growth pass.

use crate::{
    grid::{GridState, MAX_GROWTH_LEVEL},
    types::Tick,
};
use serde::{Deserialize, Serialize};

/// Upper bound on resource levels raised by plant abilities.
pub const ABILITY_RESOURCE_CAP: u8 = 10;

pub type GrowthRule = fn(usize, usize, &GridState, Tick) -> bool;
pub type SpecialAbility = fn(usize, usize, &mut GridState);

/// The built-in plant kinds. Discriminants are the on-grid plant type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PlantKind {
    SunLover = 1,
    WaterLover = 2,
    Balanced = 3,
    NeighborDependent = 4,
}

impl PlantKind {
    pub const ALL: [PlantKind; 4] = [
        PlantKind::SunLover,
        PlantKind::WaterLover,
        PlantKind::Balanced,
        PlantKind::NeighborDependent,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    /// The standard definition for this kind.
    pub fn definition(self) -> PlantTypeDefinition {
        match self {
            Self::SunLover => PlantTypeDefinition {
                name:         "Sun Lover",
                growth_rule:  sun_lover_grows,
                ability:      Some(warm_neighbors),
                stage_frames: [14, 16, 17, 18, 19],
            },
            Self::WaterLover => PlantTypeDefinition {
                name:         "Water Lover",
                growth_rule:  water_lover_grows,
                ability:      Some(irrigate_neighbors),
                stage_frames: [21, 23, 24, 25, 26],
            },
            Self::Balanced => PlantTypeDefinition {
                name:         "Balanced",
                growth_rule:  balanced_grows,
                ability:      Some(balance_own_cell),
                stage_frames: [28, 30, 31, 32, 33],
            },
            Self::NeighborDependent => PlantTypeDefinition {
                name:         "Neighbor Dependent",
                growth_rule:  neighbor_dependent_grows,
                ability:      Some(boost_neighbor_growth),
                stage_frames: [35, 37, 38, 39, 40],
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlantTypeDefinition {
    pub name:         &'static str,
    pub growth_rule:  GrowthRule,
    pub ability:      Option<SpecialAbility>,
    /// Sprite frame per growth level 1..=5.
    pub stage_frames: [u32; MAX_GROWTH_LEVEL as usize],
}

impl PlantTypeDefinition {
    pub fn can_grow(&self, x: usize, y: usize, grid: &GridState, tick: Tick) -> bool {
        (self.growth_rule)(x, y, grid, tick)
    }

    /// Advance the cell by one growth level if the rule allows it.
    ///
    /// Returns the (possibly unchanged) growth level. The special ability
    /// fires only when growth actually happened, after the increment.
    pub fn grow(&self, x: usize, y: usize, grid: &mut GridState, tick: Tick) -> u8 {
        let current = grid.growth_level(x, y);
        if current >= MAX_GROWTH_LEVEL || !self.can_grow(x, y, grid, tick) {
            return current;
        }
        let next = current + 1;
        grid.set_growth_level(x, y, next);
        if let Some(ability) = self.ability {
            ability(x, y, grid);
        }
        next
    }

    /// Sprite frame for a growth level, if the level is a living stage.
    pub fn stage_frame(&self, growth_level: u8) -> Option<u32> {
        match growth_level {
            1..=MAX_GROWTH_LEVEL => Some(self.stage_frames[growth_level as usize - 1]),
            _ => None,
        }
    }
}

/// Ordered, immutable list of plant types.
#[derive(Debug, Clone)]
pub struct PlantCatalog {
    definitions: Vec<PlantTypeDefinition>,
}

impl PlantCatalog {
    /// The four built-in kinds, in id order.
    pub fn standard() -> Self {
        Self {
            definitions: PlantKind::ALL.iter().map(|k| k.definition()).collect(),
        }
    }

    /// A custom catalog. Panics if it would not fit in a plant type byte.
    pub fn from_definitions(definitions: Vec<PlantTypeDefinition>) -> Self {
        assert!(
            definitions.len() <= u8::MAX as usize,
            "a catalog holds at most {} plant types",
            u8::MAX
        );
        Self { definitions }
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definition for an on-grid plant type id. None for 0 and unknown ids.
    pub fn get(&self, plant_type: u8) -> Option<&PlantTypeDefinition> {
        (plant_type as usize)
            .checked_sub(1)
            .and_then(|i| self.definitions.get(i))
    }

    pub fn contains(&self, plant_type: u8) -> bool {
        self.get(plant_type).is_some()
    }

    /// Every entry with its on-grid id, in catalog order.
    pub fn kinds(&self) -> impl Iterator<Item = (u8, &PlantTypeDefinition)> + '_ {
        self.definitions.iter().enumerate().map(|(i, def)| (i as u8 + 1, def))
    }

    /// Evaluate the growth rule of whatever occupies (x, y).
    pub fn can_grow(&self, x: usize, y: usize, grid: &GridState, tick: Tick) -> bool {
        self.get(grid.plant_type(x, y))
            .is_some_and(|def| def.can_grow(x, y, grid, tick))
    }

    /// Grow whatever occupies (x, y). Empty cells and unknown ids are left alone.
    pub fn grow(&self, x: usize, y: usize, grid: &mut GridState, tick: Tick) -> u8 {
        match self.get(grid.plant_type(x, y)) {
            Some(def) => def.grow(x, y, grid, tick),
            None => grid.growth_level(x, y),
        }
    }

    pub fn stage_frame(&self, plant_type: u8, growth_level: u8) -> Option<u32> {
        self.get(plant_type).and_then(|def| def.stage_frame(growth_level))
    }

    pub fn name(&self, plant_type: u8) -> &'static str {
        self.get(plant_type).map(|def| def.name).unwrap_or("Unknown")
    }
}

impl Default for PlantCatalog {
    fn default() -> Self { Self::standard() }
}

// ── Growth rules ────────────────────────────────────────────────

fn sun_lover_grows(x: usize, y: usize, grid: &GridState, tick: Tick) -> bool {
    grid.sun(x, y) > 3 && grid.water(x, y) < 3 && tick % 2 == 0
}

fn water_lover_grows(x: usize, y: usize, grid: &GridState, tick: Tick) -> bool {
    grid.water(x, y) > 3 && grid.sun(x, y) < 3 && tick % 3 == 0
}

fn balanced_grows(x: usize, y: usize, grid: &GridState, _tick: Tick) -> bool {
    grid.sun(x, y).abs_diff(grid.water(x, y)) <= 1
}

fn neighbor_dependent_grows(x: usize, y: usize, grid: &GridState, _tick: Tick) -> bool {
    grid.orthogonal_neighbors(x, y)
        .any(|(nx, ny)| grid.plant_type(nx, ny) != 0)
}

// ── Special abilities ───────────────────────────────────────────

fn warm_neighbors(x: usize, y: usize, grid: &mut GridState) {
    let neighbors: Vec<_> = grid.orthogonal_neighbors(x, y).collect();
    for (nx, ny) in neighbors {
        let sun = grid.sun(nx, ny);
        grid.set_sun(nx, ny, sun.saturating_add(1).min(ABILITY_RESOURCE_CAP));
    }
}

fn irrigate_neighbors(x: usize, y: usize, grid: &mut GridState) {
    let neighbors: Vec<_> = grid.orthogonal_neighbors(x, y).collect();
    for (nx, ny) in neighbors {
        let water = grid.water(nx, ny);
        grid.set_water(nx, ny, water.saturating_add(1).min(ABILITY_RESOURCE_CAP));
    }
}

/// Sun and water both become their average, rounded half up.
fn balance_own_cell(x: usize, y: usize, grid: &mut GridState) {
    let total = grid.sun(x, y) as u16 + grid.water(x, y) as u16;
    let average = total.div_ceil(2) as u8;
    grid.set_sun(x, y, average);
    grid.set_water(x, y, average);
}

/// Planted, not-yet-mature neighbors gain one growth level.
fn boost_neighbor_growth(x: usize, y: usize, grid: &mut GridState) {
    let neighbors: Vec<_> = grid.orthogonal_neighbors(x, y).collect();
    for (nx, ny) in neighbors {
        let growth = grid.growth_level(nx, ny);
        if growth > 0 && growth < MAX_GROWTH_LEVEL {
            grid.set_growth_level(nx, ny, growth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(grid: &mut GridState, x: usize, y: usize, kind: PlantKind, growth: u8) {
        grid.set_plant_type(x, y, kind.id());
        grid.set_growth_level(x, y, growth);
    }

    #[test]
    fn ids_are_catalog_index_plus_one() {
        let catalog = PlantCatalog::standard();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(5).is_none());
        for kind in PlantKind::ALL {
            assert_eq!(catalog.get(kind.id()).unwrap().name, kind.definition().name);
        }
        let listed: Vec<_> = catalog.kinds().map(|(id, def)| (id, def.name)).collect();
        assert_eq!(listed[0], (1, "Sun Lover"));
        assert_eq!(listed[3], (4, "Neighbor Dependent"));
    }

    #[test]
    fn grow_never_exceeds_max_level() {
        let catalog = PlantCatalog::standard();
        let mut grid = GridState::new(3);
        plant(&mut grid, 1, 1, PlantKind::Balanced, MAX_GROWTH_LEVEL);
        assert!(catalog.can_grow(1, 1, &grid, 0));
        assert_eq!(catalog.grow(1, 1, &mut grid, 0), MAX_GROWTH_LEVEL);
        assert_eq!(grid.growth_level(1, 1), MAX_GROWTH_LEVEL);
    }

    #[test]
    fn failed_predicate_is_a_no_op() {
        let catalog = PlantCatalog::standard();
        let mut grid = GridState::new(3);
        plant(&mut grid, 1, 1, PlantKind::SunLover, 2);
        grid.set_sun(1, 1, 5);
        grid.set_water(1, 1, 1);
        let before = grid.clone();
        // Odd tick: cadence not met.
        assert_eq!(catalog.grow(1, 1, &mut grid, 3), 2);
        assert_eq!(grid, before);
    }

    #[test]
    fn sun_lover_warms_neighbors_with_cap() {
        let catalog = PlantCatalog::standard();
        let mut grid = GridState::new(3);
        plant(&mut grid, 1, 1, PlantKind::SunLover, 1);
        grid.set_sun(1, 1, 4);
        grid.set_water(1, 1, 2);
        grid.set_sun(0, 1, 10);
        grid.set_sun(2, 1, 3);
        assert_eq!(catalog.grow(1, 1, &mut grid, 4), 2);
        assert_eq!(grid.sun(0, 1), 10);
        assert_eq!(grid.sun(2, 1), 4);
        assert_eq!(grid.sun(1, 0), 1);
        assert_eq!(grid.sun(1, 2), 1);
        assert_eq!(grid.sun(1, 1), 4, "own cell untouched");
    }

    #[test]
    fn water_lover_needs_third_tick() {
        let catalog = PlantCatalog::standard();
        let mut grid = GridState::new(2);
        plant(&mut grid, 0, 0, PlantKind::WaterLover, 1);
        grid.set_water(0, 0, 6);
        grid.set_sun(0, 0, 1);
        assert!(!catalog.can_grow(0, 0, &grid, 4));
        assert_eq!(catalog.grow(0, 0, &mut grid, 6), 2);
        assert_eq!(grid.water(1, 0), 1);
        assert_eq!(grid.water(0, 1), 1);
        assert_eq!(grid.water(1, 1), 0, "diagonal untouched");
    }

    #[test]
    fn balanced_averages_rounding_half_up() {
        let catalog = PlantCatalog::standard();
        let mut grid = GridState::new(1);
        plant(&mut grid, 0, 0, PlantKind::Balanced, 1);
        grid.set_sun(0, 0, 4);
        grid.set_water(0, 0, 3);
        assert_eq!(catalog.grow(0, 0, &mut grid, 1), 2);
        assert_eq!(grid.sun(0, 0), 4);
        assert_eq!(grid.water(0, 0), 4);

        grid.set_sun(0, 0, 6);
        grid.set_water(0, 0, 3);
        assert_eq!(catalog.grow(0, 0, &mut grid, 2), 2, "difference of 3 blocks growth");
    }

    #[test]
    fn neighbor_dependent_boosts_neighbors_in_one_call() {
        let catalog = PlantCatalog::standard();
        let mut grid = GridState::new(5);
        plant(&mut grid, 2, 2, PlantKind::NeighborDependent, 1);
        plant(&mut grid, 1, 2, PlantKind::SunLover, 1);
        plant(&mut grid, 3, 2, PlantKind::WaterLover, 4);
        plant(&mut grid, 2, 1, PlantKind::Balanced, MAX_GROWTH_LEVEL);

        assert_eq!(catalog.grow(2, 2, &mut grid, 1), 2);
        assert_eq!(grid.growth_level(2, 2), 2);
        assert_eq!(grid.growth_level(1, 2), 2);
        assert_eq!(grid.growth_level(3, 2), 5);
        assert_eq!(grid.growth_level(2, 1), MAX_GROWTH_LEVEL);
        assert_eq!(grid.growth_level(2, 3), 0, "empty neighbor stays empty");
        assert_eq!(grid.plant_type(2, 3), 0);
    }

    #[test]
    fn neighbor_dependent_alone_does_not_grow() {
        let catalog = PlantCatalog::standard();
        let mut grid = GridState::new(3);
        plant(&mut grid, 0, 0, PlantKind::NeighborDependent, 1);
        plant(&mut grid, 1, 1, PlantKind::Balanced, 1);
        assert!(!catalog.can_grow(0, 0, &grid, 0), "diagonals do not count");
    }

    #[test]
    fn stage_frames_follow_growth_level() {
        let catalog = PlantCatalog::standard();
        let sun = PlantKind::SunLover.id();
        assert_eq!(catalog.stage_frame(sun, 1), Some(14));
        assert_eq!(catalog.stage_frame(sun, 5), Some(19));
        assert_eq!(catalog.stage_frame(sun, 0), None);
        assert_eq!(catalog.stage_frame(0, 1), None);
    }
}
