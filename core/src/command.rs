use crate::{clock::SimSpeed, plant::PlantKind, types::SaveSlot};
use serde::{Deserialize, Serialize};

/// All player-issued commands.
/// Variants are append-only; never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,
    SetSpeed { speed: SimSpeed },
    AdvanceTime,

    // ── Garden actions ────────────────────────────
    Move { dx: i64, dy: i64 },
    Sow {
        #[serde(default)]
        kind: Option<PlantKind>,
    },
    Reap,

    // ── History and persistence ───────────────────
    Undo,
    Redo,
    Save { slot: SaveSlot },
    Load { slot: SaveSlot },

    // ── Scenario control ──────────────────────────
    LoadScenario { name: String },
}

/// What happened to a command.
///
/// Precondition violations are `NoOp`; infrastructure failures
/// (storage, decoding) are `Failed`. Neither leaves the simulation
/// partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    NoOp { reason: String },
    Failed { reason: String },
}

impl CommandOutcome {
    pub fn no_op(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::info!("{reason}");
        Self::NoOp { reason }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::error!("{reason}");
        Self::Failed { reason }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}
