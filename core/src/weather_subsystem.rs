//! Weather phase: per-tick resource regeneration.
//!
//! Sun is overwritten with a fresh roll; it never carries over.
//! Water gains a roll on top of what is already there, up to the cap.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::{SimSubsystem, TickContext},
};

#[derive(Debug, Default)]
pub struct WeatherSubsystem;

impl WeatherSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl SimSubsystem for WeatherSubsystem {
    fn name(&self) -> &'static str { "weather" }

    fn update(
        &mut self,
        ctx: &mut TickContext<'_>,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let w = ctx.weather;
        let size = ctx.grid.size();
        for y in 0..size {
            for x in 0..size {
                let sun = rng.range_u8(w.sun_min, w.sun_max);
                let gain = rng.range_u8(w.water_gain_min, w.water_gain_max);
                let water = ctx.grid.water(x, y).saturating_add(gain).min(w.water_cap);
                ctx.grid.set_sun(x, y, sun);
                ctx.grid.set_water(x, y, water);
            }
        }
        log::debug!("tick={} weather: rolled {size}x{size} cells", ctx.tick);
        Ok(vec![])
    }
}
