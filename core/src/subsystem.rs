//! Tick-phase trait.
//!
//! RULE: Every per-cell rule phase implements SimSubsystem.
//! The session calls update() on each registered phase
//! in registration order, every tick.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    config::WeatherConfig,
    error::SimResult,
    event::SimEvent,
    grid::GridState,
    plant::PlantCatalog,
    rng::SubsystemRng,
    types::Tick,
};

/// Everything a phase may read or write during one tick.
pub struct TickContext<'a> {
    pub tick:    Tick,
    pub grid:    &'a mut GridState,
    pub catalog: &'a PlantCatalog,
    /// Weather in force this tick (scenario override already applied).
    pub weather: WeatherConfig,
}

/// The contract every tick phase must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this phase.
    fn name(&self) -> &'static str;

    /// Called once per tick by the session.
    ///
    /// - `ctx`: the grid and read-only rules for this tick
    /// - `rng`: this phase's deterministic RNG for this tick
    ///
    /// Returns the events this phase produced.
    fn update(
        &mut self,
        ctx: &mut TickContext<'_>,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;
}
