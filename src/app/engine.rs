//! Terrain engine facade.
//!
//! Owns every streaming component and runs them in order once per frame:
//! chunk store update, visibility culling, then budget control.

use std::sync::Arc;

use glam::{DVec2, Mat4};

use crate::app::governor::{Budgets, PerformanceGovernor, SynthesisThroughput};
use crate::app::interfaces::{CameraFrustumSource, TerrainHeightSource, ViewpointProvider};
use crate::core::{ChunkCoord, ChunkState};
use crate::error::ConfigError;
use crate::render::culling::VisibilityCuller;
use crate::render::lod::LodSelector;
use crate::render::pool::{GeometryBuffer, GeometryPool};
use crate::utils::settings::TerrainSettings;
use crate::world::biome::{Biome, Rgb};
use crate::world::generator::TerrainGenerator;
use crate::world::loader::{ChunkLoader, InlineSynthesizer, SynthesisBackend};
use crate::world::store::{ChunkStore, UpdateReport};

/// What the renderer needs to draw one resident chunk.
pub struct RenderableChunk<'a> {
    pub coord: ChunkCoord,
    pub geometry: &'a GeometryBuffer,
    pub transform: Mat4,
    pub visible: bool,
    pub material_tier: u8,
    pub resolution: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Diagnostics {
    pub frame: u64,
    pub resident: usize,
    pub pending: usize,
    pub capacity: usize,
    pub visible: usize,
    pub pool_hits: u64,
    pub pool_misses: u64,
    pub pool_hit_rate: f64,
    pub idle_buffers: u64,
    pub idle_budget: usize,
    pub synthesis: SynthesisThroughput,
    pub average_frame_ms: f64,
    pub workers: usize,
}

pub struct TerrainEngine {
    settings: TerrainSettings,
    generator: Arc<TerrainGenerator>,
    pool: Arc<GeometryPool>,
    store: ChunkStore,
    culler: VisibilityCuller,
    governor: PerformanceGovernor,
    frame: u64,
}

impl TerrainEngine {
    /// Validate `settings` and start the streaming components.
    pub fn new(seed: u32, settings: TerrainSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let streaming = &settings.streaming;

        let lod = LodSelector::new(settings.lod.clone(), streaming.lod_hysteresis)?;
        let generator = Arc::new(TerrainGenerator::new(seed, &settings));
        let pool = Arc::new(GeometryPool::new(streaming.idle_budget));

        let workers = streaming
            .worker_count
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1).max(1));
        let backend: Box<dyn SynthesisBackend> = if workers == 0 {
            Box::new(InlineSynthesizer::new(Arc::clone(&generator)))
        } else {
            Box::new(ChunkLoader::new(
                Arc::clone(&generator),
                workers,
                streaming.request_queue_capacity,
                streaming.result_queue_capacity,
            ))
        };

        let store = ChunkStore::new(streaming, lod, Arc::clone(&pool), backend);
        let culler = VisibilityCuller::new(
            settings.culling.enabled,
            settings.culling.sphere_cache_soft_cap,
        );
        let governor = PerformanceGovernor::new(settings.governor.clone());

        tracing::info!(
            seed,
            device = ?settings.device,
            workers,
            capacity = streaming.capacity,
            view_distance = streaming.view_distance,
            "terrain engine ready"
        );

        Ok(TerrainEngine {
            settings,
            generator,
            pool,
            store,
            culler,
            governor,
            frame: 0,
        })
    }

    pub fn seed(&self) -> u32 {
        self.generator.seed
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn generator(&self) -> &Arc<TerrainGenerator> {
        &self.generator
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn culler(&self) -> &VisibilityCuller {
        &self.culler
    }

    pub fn pool(&self) -> &GeometryPool {
        &self.pool
    }

    /// Ground position the streaming window is centred on.
    pub fn streaming_center<V: ViewpointProvider + ?Sized>(&self, viewpoint: &V) -> DVec2 {
        let position = viewpoint.position().as_dvec3();
        let forward = viewpoint.forward().as_dvec3();
        let heading = DVec2::new(forward.x, forward.z).normalize_or_zero();
        DVec2::new(position.x, position.z) + heading * self.settings.streaming.look_ahead
    }

    /// Run one frame. `dt` is the previous frame's duration in seconds.
    pub fn frame<V, C>(&mut self, viewpoint: &V, camera: &C, dt: f64) -> UpdateReport
    where
        V: ViewpointProvider + ?Sized,
        C: CameraFrustumSource + ?Sized,
    {
        self.frame += 1;
        let chunk_size = self.store.chunk_size();

        let center = self.streaming_center(viewpoint);
        let report = self.store.update(center);
        for elapsed in &report.synthesis_times {
            self.governor.record_throughput(*elapsed);
        }

        self.culler.forget(&report.invalidated);
        self.culler.begin_frame(camera);
        self.culler.update(self.store.records_mut(), chunk_size);

        let current = Budgets {
            capacity: self.store.capacity(),
            idle_budget: self.pool.idle_budget(),
        };
        if let Some(adjustment) = self.governor.record_frame(dt, current) {
            let trimmed = self.store.set_capacity(adjustment.after.capacity);
            self.culler.forget(&trimmed.invalidated);
            self.pool.set_idle_budget(adjustment.after.idle_budget);
        }

        report
    }

    /// Replace the seed and drop every chunk; they stream back in on the next frames.
    pub fn regenerate(&mut self, seed: u32) -> UpdateReport {
        let generator = Arc::new(TerrainGenerator::new(seed, &self.settings));
        let report = self.store.regenerate(Arc::clone(&generator));
        self.culler.clear();
        self.generator = generator;
        tracing::info!(seed, evicted = report.evicted, "terrain regenerated");
        report
    }

    pub fn ensure_resident(&mut self, coord: ChunkCoord, position: DVec2) -> ChunkState {
        let (state, report) = self.store.ensure_resident(coord, position);
        self.culler.forget(&report.invalidated);
        state
    }

    pub fn renderables(&self) -> impl Iterator<Item = RenderableChunk<'_>> {
        let chunk_size = self.store.chunk_size();
        let lod = self.store.lod();
        self.store.records().map(move |record| RenderableChunk {
            coord: record.coord(),
            geometry: record.geometry(),
            transform: record.transform(chunk_size),
            visible: record.visible,
            material_tier: lod.tier(record.tier()).material_tier,
            resolution: record.resolution(),
        })
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let pool = self.pool.stats();
        Diagnostics {
            frame: self.frame,
            resident: self.store.resident_count(),
            pending: self.store.pending_count(),
            capacity: self.store.capacity(),
            visible: self.culler.visible_count(),
            pool_hits: pool.hits,
            pool_misses: pool.misses,
            pool_hit_rate: pool.hit_rate(),
            idle_buffers: pool.idle,
            idle_budget: self.pool.idle_budget(),
            synthesis: self.governor.throughput(),
            average_frame_ms: self.governor.average_frame_ms(),
            workers: self.store.worker_count(),
        }
    }

    pub fn color(&self, height: f64, x: f64, z: f64) -> Rgb {
        self.generator.color(height, x, z)
    }

    pub fn biome(&self, x: f64, z: f64) -> Biome {
        self.generator.biome(x, z)
    }
}

impl TerrainHeightSource for TerrainEngine {
    fn height(&self, x: f64, z: f64) -> f64 {
        self.generator.height(x, z)
    }

    fn slope(&self, x: f64, z: f64) -> f64 {
        self.generator.slope(x, z)
    }

    fn water_level(&self) -> f64 {
        self.generator.height_field().water_level()
    }

    fn chunk_size(&self) -> f64 {
        self.store.chunk_size()
    }

    fn view_distance(&self) -> u32 {
        self.store.view_distance()
    }
}
