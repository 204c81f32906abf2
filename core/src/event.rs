//! Simulation events: the notification channel to the presentation layer.
//!
//! RULE: The core never renders. Every visual-affecting change is
//! announced as an event; `RedrawRequested` is the refresh signal.
//! Events are also appended to the event log for diagnostics.

use crate::types::{RunId, SaveSlot, Tick};
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants are append-only; never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    TickStarted {
        tick: Tick,
    },
    TickCompleted {
        tick: Tick,
    },
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    RedrawRequested {
        tick: Tick,
    },

    // ── Growth events ──────────────────────────────
    PlantGrew {
        tick: Tick,
        x: usize,
        y: usize,
        plant_type: u8,
        growth_level: u8,
    },

    // ── Player action events ───────────────────────
    PlayerMoved {
        tick: Tick,
        x: usize,
        y: usize,
    },
    PlantSown {
        tick: Tick,
        x: usize,
        y: usize,
        plant_type: u8,
    },
    PlantReaped {
        tick: Tick,
        x: usize,
        y: usize,
        plant_type: u8,
        growth_level: u8,
    },

    // ── Scenario events ────────────────────────────
    ScenarioLoaded {
        tick: Tick,
        name: String,
        grid_size: usize,
    },
    ScenarioEventFired {
        tick: Tick,
        action: String,
    },
    ScenarioWarning {
        tick: Tick,
        message: String,
    },
    VictoryAchieved {
        tick: Tick,
        scenario: String,
    },
    ScenarioChainEnded {
        tick: Tick,
        scenario: String,
    },

    // ── Snapshot events ────────────────────────────
    StateRestored {
        tick: Tick,
        source: String,
    },
    GameSaved {
        tick: Tick,
        slot: SaveSlot,
    },
}

impl SimEvent {
    /// Stable string name for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TickStarted { .. }        => "tick_started",
            Self::TickCompleted { .. }      => "tick_completed",
            Self::RunInitialized { .. }     => "run_initialized",
            Self::RedrawRequested { .. }    => "redraw_requested",
            Self::PlantGrew { .. }          => "plant_grew",
            Self::PlayerMoved { .. }        => "player_moved",
            Self::PlantSown { .. }          => "plant_sown",
            Self::PlantReaped { .. }        => "plant_reaped",
            Self::ScenarioLoaded { .. }     => "scenario_loaded",
            Self::ScenarioEventFired { .. } => "scenario_event_fired",
            Self::ScenarioWarning { .. }    => "scenario_warning",
            Self::VictoryAchieved { .. }    => "victory_achieved",
            Self::ScenarioChainEnded { .. } => "scenario_chain_ended",
            Self::StateRestored { .. }      => "state_restored",
            Self::GameSaved { .. }          => "game_saved",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub tick: Tick,
    pub source: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}
