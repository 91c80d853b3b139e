// World constants
pub const DEFAULT_SEED: u32 = 2137;
pub const CHUNK_SIZE: f64 = 64.0;
pub const VIEW_DISTANCE: i32 = 8;
pub const WATER_LEVEL: f64 = 0.0;

// Mesh constants
pub const MIN_RESOLUTION: u32 = 2;
pub const MAX_RESOLUTION: u32 = 129;

// Sampling constants
pub const SLOPE_SAMPLE_OFFSET: f64 = 2.0;
pub const FALLBACK_HEIGHT: f64 = 0.0;

// Streaming constants
pub const CHUNK_CAPACITY: usize = 256;
pub const POOL_IDLE_BUDGET: usize = 64;
pub const MAX_RESULTS_PER_FRAME: usize = 8;
pub const RESULT_TIME_BUDGET_MS: f64 = 2.0;
pub const REQUEST_QUEUE_CAPACITY: usize = 256;
pub const RESULT_QUEUE_CAPACITY: usize = 64;
pub const LOD_HYSTERESIS: f64 = 8.0;
pub const SPHERE_CACHE_SOFT_CAP: usize = 512;

// Governor constants
pub const FRAME_WINDOW: usize = 120;
pub const GOVERNOR_INTERVAL_SECS: f64 = 10.0;
pub const SLOW_FRAME_MS: f64 = 33.3;
pub const FAST_FRAME_MS: f64 = 18.0;
