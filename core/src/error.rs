use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decompression error: {0}")]
    Decompression(#[from] lz4_flex::block::DecompressError),

    #[error("Corrupt snapshot: {reason}")]
    CorruptSnapshot { reason: String },

    #[error("No save found in {slot}")]
    SlotEmpty { slot: String },

    #[error("Scenario '{name}' not found")]
    ScenarioNotFound { name: String },

    #[error("Scenario '{name}' is invalid: {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
