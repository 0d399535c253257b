use thiserror::Error;

/// Why a block set could not become a structure.
///
/// Spawning fails before touching the physics world or the scene, so any of
/// these leaves the [`crate::DestructionWorld`] unchanged.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("structure has no blocks")]
    NoBlocks,

    #[error("block size must be a positive finite number, got {0}")]
    InvalidBlockSize(f32),

    #[error("block {index} has a non-finite or out-of-range coordinate")]
    InvalidCoordinate { index: usize },

    #[error("malformed structure data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Rejected tunables document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse tunables: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("tunable `{name}` is out of range: {reason}")]
    OutOfRange { name: &'static str, reason: &'static str },
}
