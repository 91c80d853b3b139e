//! Error types for configuration, chunk synthesis and world manifests.

use thiserror::Error;

use crate::core::ChunkCoord;

/// Malformed configuration. Always fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("LOD table has no tiers")]
    EmptyLodTable,
    #[error("LOD tier {index}: distance bound {bound} does not exceed previous bound {previous}")]
    UnorderedLodBounds {
        index: usize,
        bound: f64,
        previous: f64,
    },
    #[error("LOD tier {index}: resolution {resolution} is finer than previous tier ({previous})")]
    IncreasingLodResolution {
        index: usize,
        resolution: u32,
        previous: u32,
    },
    #[error("LOD tier {index}: resolution {resolution} outside {min}..={max}")]
    ResolutionOutOfRange {
        index: usize,
        resolution: u32,
        min: u32,
        max: u32,
    },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Failure while building one chunk. The chunk stays absent and is retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthesisError {
    #[error("chunk {coord} produced non-finite geometry")]
    NonFiniteGeometry { coord: ChunkCoord },
    #[error("buffer resolution {resolution} cannot hold a terrain grid")]
    InvalidResolution { resolution: u32 },
    #[error("synthesis worker panicked while building chunk {coord}")]
    WorkerPanicked { coord: ChunkCoord },
    #[error("synthesis request queue is full")]
    QueueFull,
    #[error("synthesis workers have shut down")]
    Disconnected,
}

/// Errors reading or writing a world manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a world manifest file")]
    BadMagic,
    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u32),
    #[error("manifest payload declares {declared} bytes but only {available} follow")]
    Truncated { declared: u64, available: u64 },
    #[error("manifest codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("manifest settings rejected: {0}")]
    Config(#[from] ConfigError),
}
