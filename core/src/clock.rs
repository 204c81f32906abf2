//! Simulation clock: owns tick state, speed control, and pause.
//!
//! The clock only counts. The tick pipeline that runs on each advance
//! lives in engine.rs.

use crate::types::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub current_tick: Tick,
    pub speed:        SimSpeed,
    /// Gates timer-driven ticks only. Manual advances always run.
    pub paused:       bool,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            current_tick: 0,
            speed: SimSpeed::Normal,
            paused: false,
        }
    }

    /// Advance one tick. Returns the new tick number.
    pub fn advance(&mut self) -> Tick {
        self.current_tick += 1;
        self.current_tick
    }

    /// Jump to a restored tick.
    pub fn rewind_to(&mut self, tick: Tick) {
        self.current_tick = tick;
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    pub fn set_speed(&mut self, speed: SimSpeed) {
        self.speed = speed;
    }

    /// How many ticks one timer firing should run. Zero while paused.
    pub fn ticks_per_timer_step(&self) -> u32 {
        if self.paused {
            return 0;
        }
        match self.speed {
            SimSpeed::Normal      => 1,
            SimSpeed::Accelerated => 3,
            SimSpeed::FastForward => 10,
        }
    }
}

impl Default for SimClock {
    fn default() -> Self { Self::new() }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimSpeed {
    Normal,       // 1 tick per timer firing
    Accelerated,  // 3 ticks per timer firing
    FastForward,  // 10 ticks per timer firing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_by_one() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        clock.rewind_to(0);
        assert_eq!(clock.advance(), 1);
    }

    #[test]
    fn pause_stops_timer_steps() {
        let mut clock = SimClock::new();
        clock.set_speed(SimSpeed::FastForward);
        assert_eq!(clock.ticks_per_timer_step(), 10);
        clock.pause();
        assert_eq!(clock.ticks_per_timer_step(), 0);
        clock.resume();
        assert_eq!(clock.ticks_per_timer_step(), 10);
    }
}
