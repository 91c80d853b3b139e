use serde::{Deserialize, Serialize};

use crate::app::governor::GovernorSettings;
use crate::constants::*;
use crate::error::ConfigError;
use crate::render::lod::LodTable;
use crate::world::biome::BiomePalette;
use crate::world::terrain::TerrainParams;

/// Target hardware class. Selects LOD tables and streaming presets.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TerrainSettings {
    #[serde(default)]
    pub device: DeviceClass,
    #[serde(default)]
    pub terrain: TerrainParams,
    #[serde(default)]
    pub palette: BiomePalette,
    #[serde(default)]
    pub streaming: StreamingSettings,
    #[serde(default)]
    pub lod: LodTable,
    #[serde(default)]
    pub culling: CullingSettings,
    #[serde(default)]
    pub governor: GovernorSettings,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self::for_device(DeviceClass::Desktop)
    }
}

impl TerrainSettings {
    pub fn for_device(device: DeviceClass) -> Self {
        Self {
            device,
            terrain: TerrainParams::default(),
            palette: BiomePalette::default(),
            streaming: StreamingSettings::for_device(device),
            lod: LodTable::for_device(device),
            culling: CullingSettings::for_device(device),
            governor: GovernorSettings::for_device(device),
        }
    }

    /// Checks every section. Any error here is fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()?;
        self.palette.validate()?;
        self.streaming.validate()?;
        self.lod.validate()?;
        self.governor.validate()?;
        if self.culling.sphere_cache_soft_cap == 0 && self.culling.enabled {
            return Err(ConfigError::invalid(
                "culling.sphere_cache_soft_cap",
                "must be positive when culling is enabled",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StreamingSettings {
    pub chunk_size: f64,
    pub view_distance: u32,
    pub capacity: usize,
    pub idle_budget: usize,
    /// `None` picks one worker per spare core; `Some(0)` synthesizes inline.
    pub worker_count: Option<usize>,
    pub max_results_per_frame: usize,
    pub result_time_budget_ms: f64,
    pub lod_hysteresis: f64,
    /// World units the streaming window is shifted along the view direction.
    pub look_ahead: f64,
    pub request_queue_capacity: usize,
    pub result_queue_capacity: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self::for_device(DeviceClass::Desktop)
    }
}

impl StreamingSettings {
    pub fn for_device(device: DeviceClass) -> Self {
        let desktop = Self {
            chunk_size: CHUNK_SIZE,
            view_distance: VIEW_DISTANCE as u32,
            capacity: CHUNK_CAPACITY,
            idle_budget: POOL_IDLE_BUDGET,
            worker_count: None,
            max_results_per_frame: MAX_RESULTS_PER_FRAME,
            result_time_budget_ms: RESULT_TIME_BUDGET_MS,
            lod_hysteresis: LOD_HYSTERESIS,
            look_ahead: 0.0,
            request_queue_capacity: REQUEST_QUEUE_CAPACITY,
            result_queue_capacity: RESULT_QUEUE_CAPACITY,
        };
        match device {
            DeviceClass::Desktop => desktop,
            DeviceClass::Mobile => Self {
                view_distance: 5,
                capacity: 96,
                idle_budget: 16,
                worker_count: Some(1),
                max_results_per_frame: 4,
                result_time_budget_ms: 1.0,
                request_queue_capacity: 64,
                result_queue_capacity: 16,
                ..desktop
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.chunk_size > 0.0 && self.chunk_size.is_finite()) {
            return Err(ConfigError::invalid(
                "streaming.chunk_size",
                format!("{} is not a positive size", self.chunk_size),
            ));
        }
        if self.view_distance > i32::MAX as u32 / 2 {
            return Err(ConfigError::invalid("streaming.view_distance", "too large"));
        }
        if self.max_results_per_frame == 0 {
            return Err(ConfigError::invalid(
                "streaming.max_results_per_frame",
                "at least one result must be integrated per frame",
            ));
        }
        if !(self.result_time_budget_ms >= 0.0 && self.result_time_budget_ms.is_finite()) {
            return Err(ConfigError::invalid(
                "streaming.result_time_budget_ms",
                "must be a non-negative duration",
            ));
        }
        if !(self.lod_hysteresis >= 0.0 && self.lod_hysteresis.is_finite()) {
            return Err(ConfigError::invalid(
                "streaming.lod_hysteresis",
                "must be a non-negative distance",
            ));
        }
        if !(self.look_ahead >= 0.0 && self.look_ahead.is_finite()) {
            return Err(ConfigError::invalid("streaming.look_ahead", "must be non-negative"));
        }
        if self.request_queue_capacity == 0 || self.result_queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "streaming.queue_capacity",
                "synthesis queues need at least one slot",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CullingSettings {
    pub enabled: bool,
    pub sphere_cache_soft_cap: usize,
}

impl Default for CullingSettings {
    fn default() -> Self {
        Self::for_device(DeviceClass::Desktop)
    }
}

impl CullingSettings {
    pub fn for_device(device: DeviceClass) -> Self {
        Self {
            enabled: device == DeviceClass::Desktop,
            sphere_cache_soft_cap: SPHERE_CACHE_SOFT_CAP,
        }
    }
}
