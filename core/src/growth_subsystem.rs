//! Growth phase: applies each plant type's rule once per cell per tick.
//!
//! PASS ORDER: row-major (y outer, x inner), sequential. A cell sees the
//! grid as already modified by cells earlier in the pass, including
//! growth and abilities applied this tick.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::{SimSubsystem, TickContext},
};

#[derive(Debug, Default)]
pub struct GrowthSubsystem;

impl GrowthSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl SimSubsystem for GrowthSubsystem {
    fn name(&self) -> &'static str { "growth" }

    fn update(
        &mut self,
        ctx: &mut TickContext<'_>,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        let size = ctx.grid.size();

        for y in 0..size {
            for x in 0..size {
                let plant_type = ctx.grid.plant_type(x, y);
                if plant_type == 0 {
                    continue;
                }
                let Some(def) = ctx.catalog.get(plant_type) else {
                    log::warn!("tick={} unknown plant type {plant_type} at ({x}, {y}); not grown", ctx.tick);
                    continue;
                };
                let before = ctx.grid.growth_level(x, y);
                let after = def.grow(x, y, ctx.grid, ctx.tick);
                if after > before {
                    log::debug!("{} at ({x}, {y}) grew to level {after}", def.name);
                    events.push(SimEvent::PlantGrew {
                        tick: ctx.tick,
                        x,
                        y,
                        plant_type,
                        growth_level: after,
                    });
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::WeatherConfig,
        grid::GridState,
        plant::{PlantCatalog, PlantKind},
        rng::{RngBank, SubsystemSlot},
    };

    fn run(grid: &mut GridState, tick: u64) -> Vec<SimEvent> {
        let catalog = PlantCatalog::standard();
        let mut ctx = TickContext { tick, grid, catalog: &catalog, weather: WeatherConfig::default() };
        let mut rng = RngBank::new(1).for_subsystem_at_tick(SubsystemSlot::Growth, tick);
        GrowthSubsystem::new().update(&mut ctx, &mut rng).unwrap()
    }

    #[test]
    fn later_cells_see_earlier_growth_in_the_same_pass() {
        let mut grid = GridState::new(2);
        grid.set_plant_type(0, 0, PlantKind::NeighborDependent.id());
        grid.set_growth_level(0, 0, 1);
        grid.set_plant_type(1, 0, PlantKind::NeighborDependent.id());
        grid.set_growth_level(1, 0, 1);

        let events = run(&mut grid, 1);
        // (0,0) grows to 2 and boosts (1,0) to 2; (1,0) then grows to 3
        // and boosts (0,0) to 3.
        assert_eq!(grid.growth_level(0, 0), 3);
        assert_eq!(grid.growth_level(1, 0), 3);
        assert_eq!(
            events,
            vec![
                SimEvent::PlantGrew { tick: 1, x: 0, y: 0, plant_type: 4, growth_level: 2 },
                SimEvent::PlantGrew { tick: 1, x: 1, y: 0, plant_type: 4, growth_level: 3 },
            ]
        );
    }

    #[test]
    fn empty_and_unknown_cells_are_skipped() {
        let mut grid = GridState::new(2);
        grid.set_plant_type(1, 1, 200);
        grid.set_growth_level(1, 1, 1);
        let before = grid.clone();
        assert!(run(&mut grid, 2).is_empty());
        assert_eq!(grid, before);
    }
}
