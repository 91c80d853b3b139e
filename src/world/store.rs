//! Authoritative map of streamed chunks.
//!
//! The store decides which coordinates should be resident around the
//! viewpoint, hands synthesis jobs to a backend, integrates completed
//! geometry and releases buffers back to the pool on eviction. Pending
//! chunks count toward capacity, so integrating a result can never push the
//! resident count over the limit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::DVec2;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{ChunkCoord, ChunkRecord, ChunkState, PendingLod};
use crate::error::SynthesisError;
use crate::render::lod::LodSelector;
use crate::render::pool::GeometryPool;
use crate::utils::settings::StreamingSettings;
use crate::world::generator::TerrainGenerator;
use crate::world::loader::{SynthesisBackend, SynthesisJob, SynthesisResult};

enum Slot {
    Pending { tier: usize, ticket: u64 },
    Resident(ChunkRecord),
}

/// What one `update` did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateReport {
    /// Chunks that became resident.
    pub admitted: usize,
    /// Resident chunks removed, either out of range or displaced by closer ones.
    pub evicted: usize,
    /// Pending chunks dropped before their geometry arrived.
    pub cancelled: usize,
    pub lod_changed: usize,
    /// Stale results thrown away.
    pub discarded: usize,
    pub failed: usize,
    /// Desired coordinates left absent this frame (capacity or queue full).
    pub skipped: usize,
    /// Coordinates whose bound geometry changed or went away.
    pub invalidated: Vec<ChunkCoord>,
    /// Synthesis time of every job integrated this frame.
    pub synthesis_times: Vec<Duration>,
}

pub struct ChunkStore {
    slots: FxHashMap<ChunkCoord, Slot>,
    pool: Arc<GeometryPool>,
    lod: LodSelector,
    backend: Box<dyn SynthesisBackend>,
    chunk_size: f64,
    view_distance: u32,
    capacity: usize,
    max_results_per_frame: usize,
    result_budget: Duration,
    next_ticket: u64,
    last_viewpoint: Option<DVec2>,
}

impl ChunkStore {
    pub fn new(
        settings: &StreamingSettings,
        lod: LodSelector,
        pool: Arc<GeometryPool>,
        backend: Box<dyn SynthesisBackend>,
    ) -> Self {
        ChunkStore {
            slots: FxHashMap::default(),
            pool,
            lod,
            backend,
            chunk_size: settings.chunk_size,
            view_distance: settings.view_distance,
            capacity: settings.capacity,
            max_results_per_frame: settings.max_results_per_frame,
            result_budget: Duration::from_secs_f64(settings.result_time_budget_ms / 1000.0),
            next_ticket: 0,
            last_viewpoint: None,
        }
    }

    pub fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    pub fn view_distance(&self) -> u32 {
        self.view_distance
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lod(&self) -> &LodSelector {
        &self.lod
    }

    pub fn pool(&self) -> &Arc<GeometryPool> {
        &self.pool
    }

    pub fn worker_count(&self) -> usize {
        self.backend.worker_count()
    }

    pub fn in_flight(&self) -> usize {
        self.backend.in_flight()
    }

    pub fn set_result_limits(&mut self, max_results_per_frame: usize, budget: Duration) {
        self.max_results_per_frame = max_results_per_frame;
        self.result_budget = budget;
    }

    pub fn state(&self, coord: ChunkCoord) -> ChunkState {
        match self.slots.get(&coord) {
            None => ChunkState::Absent,
            Some(Slot::Pending { tier, .. }) => ChunkState::Pending { tier: *tier },
            Some(Slot::Resident(record)) => ChunkState::Resident {
                tier: record.tier(),
            },
        }
    }

    pub fn record(&self, coord: ChunkCoord) -> Option<&ChunkRecord> {
        match self.slots.get(&coord) {
            Some(Slot::Resident(record)) => Some(record),
            _ => None,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.slots.values().filter_map(|slot| match slot {
            Slot::Resident(record) => Some(record),
            Slot::Pending { .. } => None,
        })
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ChunkRecord> {
        self.slots.values_mut().filter_map(|slot| match slot {
            Slot::Resident(record) => Some(record),
            Slot::Pending { .. } => None,
        })
    }

    pub fn resident_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Resident(_)))
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len() - self.resident_count()
    }

    /// Coordinates that should be resident around `viewpoint`, nearest first.
    pub fn desired_set(&self, viewpoint: DVec2) -> Vec<(f64, ChunkCoord)> {
        let center = ChunkCoord::from_world(viewpoint, self.chunk_size);
        let mut desired: Vec<_> = center
            .window(self.view_distance as i32)
            .map(|coord| (coord.distance_to(viewpoint, self.chunk_size), coord))
            .collect();
        desired.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        desired.dedup_by_key(|entry| entry.1);
        desired
    }

    /// Run one streaming step for the viewpoint's ground position `(x, z)`.
    pub fn update(&mut self, viewpoint: DVec2) -> UpdateReport {
        let mut report = UpdateReport::default();
        let deadline = Instant::now() + self.result_budget;
        let mut result_quota = self.max_results_per_frame;
        self.last_viewpoint = Some(viewpoint);

        let desired = self.desired_set(viewpoint);
        let wanted: FxHashSet<ChunkCoord> = desired.iter().map(|(_, coord)| *coord).collect();

        let departed: Vec<ChunkCoord> = self
            .slots
            .keys()
            .filter(|coord| !wanted.contains(coord))
            .copied()
            .collect();
        for coord in departed {
            self.evict(coord, &mut report);
        }

        self.integrate(&mut report, &mut result_quota, deadline);

        for (index, &(distance, coord)) in desired.iter().enumerate() {
            if self.slots.contains_key(&coord) {
                continue;
            }
            match self.admit(coord, distance, viewpoint, &mut report) {
                Ok(true) => {}
                Ok(false) => report.skipped += 1,
                Err(SynthesisError::QueueFull) | Err(SynthesisError::Disconnected) => {
                    // Remaining coordinates wait for the next frame
                    report.skipped += desired[index..]
                        .iter()
                        .filter(|(_, c)| !self.slots.contains_key(c))
                        .count();
                    break;
                }
                Err(_) => report.skipped += 1,
            }
        }

        self.refresh_lod(viewpoint, &mut report);
        self.integrate(&mut report, &mut result_quota, deadline);

        if report.admitted + report.evicted + report.lod_changed > 0 {
            tracing::debug!(
                admitted = report.admitted,
                evicted = report.evicted,
                lod_changed = report.lod_changed,
                resident = self.resident_count(),
                pending = self.pending_count(),
                "chunk store updated"
            );
        }
        report
    }

    /// Admit a single coordinate as if it were desired this frame.
    pub fn ensure_resident(&mut self, coord: ChunkCoord, viewpoint: DVec2) -> (ChunkState, UpdateReport) {
        let mut report = UpdateReport::default();
        if !self.slots.contains_key(&coord) {
            let distance = coord.distance_to(viewpoint, self.chunk_size);
            match self.admit(coord, distance, viewpoint, &mut report) {
                Ok(true) => {}
                _ => report.skipped += 1,
            }
            let mut quota = self.max_results_per_frame;
            self.integrate(&mut report, &mut quota, Instant::now() + self.result_budget);
        }
        (self.state(coord), report)
    }

    /// Change the capacity, evicting the farthest chunks if it shrank.
    pub fn set_capacity(&mut self, capacity: usize) -> UpdateReport {
        let mut report = UpdateReport::default();
        self.capacity = capacity;
        let viewpoint = self.last_viewpoint.unwrap_or(DVec2::ZERO);
        while self.slots.len() > self.capacity {
            let Some((coord, _)) = self.farthest(viewpoint) else {
                break;
            };
            self.evict(coord, &mut report);
        }
        report
    }

    /// Wait for in-flight work, switch generators and drop every chunk.
    pub fn regenerate(&mut self, generator: Arc<TerrainGenerator>) -> UpdateReport {
        let mut report = UpdateReport::default();
        for result in self.backend.drain() {
            self.pool.release(result.buffer);
        }
        self.backend.set_generator(generator);

        let coords: Vec<ChunkCoord> = self.slots.keys().copied().collect();
        for coord in coords {
            self.evict(coord, &mut report);
        }
        report
    }

    /// Drop everything, waiting for in-flight jobs so their buffers come back.
    pub fn clear(&mut self) -> UpdateReport {
        let mut report = UpdateReport::default();
        let coords: Vec<ChunkCoord> = self.slots.keys().copied().collect();
        for coord in coords {
            self.evict(coord, &mut report);
        }
        for result in self.backend.drain() {
            report.discarded += 1;
            self.pool.release(result.buffer);
        }
        report
    }

    fn evict(&mut self, coord: ChunkCoord, report: &mut UpdateReport) {
        match self.slots.remove(&coord) {
            Some(Slot::Resident(record)) => {
                report.evicted += 1;
                report.invalidated.push(coord);
                self.pool.release(record.into_geometry());
            }
            Some(Slot::Pending { .. }) => report.cancelled += 1,
            None => {}
        }
    }

    /// Farthest resident-or-pending chunk, ties broken toward the larger coordinate.
    fn farthest(&self, viewpoint: DVec2) -> Option<(ChunkCoord, f64)> {
        self.slots
            .keys()
            .map(|coord| (*coord, coord.distance_to(viewpoint, self.chunk_size)))
            .max_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }

    /// Returns `Ok(false)` when the coordinate lost to capacity.
    fn admit(
        &mut self,
        coord: ChunkCoord,
        distance: f64,
        viewpoint: DVec2,
        report: &mut UpdateReport,
    ) -> Result<bool, SynthesisError> {
        let victim = if self.slots.len() >= self.capacity {
            match self.farthest(viewpoint) {
                Some((victim, far)) if far > distance && self.slots.len() - 1 < self.capacity => Some(victim),
                _ => return Ok(false),
            }
        } else {
            None
        };

        // The victim stays resident unless the replacement was accepted
        let tier = self.lod.select_index(distance);
        let ticket = self.submit(coord, tier)?;
        if let Some(victim) = victim {
            self.evict(victim, report);
        }
        self.slots.insert(coord, Slot::Pending { tier, ticket });
        Ok(true)
    }

    fn submit(&mut self, coord: ChunkCoord, tier: usize) -> Result<u64, SynthesisError> {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let buffer = self.pool.acquire(self.lod.tier(tier).resolution);
        match self.backend.submit(SynthesisJob {
            ticket,
            coord,
            tier,
            buffer,
        }) {
            Ok(()) => Ok(ticket),
            Err(rejected) => {
                self.pool.release(rejected.job.buffer);
                Err(rejected.reason)
            }
        }
    }

    fn refresh_lod(&mut self, viewpoint: DVec2, report: &mut UpdateReport) {
        let mut wanted = Vec::new();
        for slot in self.slots.values_mut() {
            let Slot::Resident(record) = slot else {
                continue;
            };
            let distance = record.coord().distance_to(viewpoint, self.chunk_size);
            let target = self
                .lod
                .select_index_with_hysteresis(distance, record.tier());

            match record.pending_lod {
                // Moved back before the swap landed
                Some(_) if target == record.tier() => {
                    record.pending_lod = None;
                    report.cancelled += 1;
                }
                Some(pending) if pending.tier == target => {}
                _ if target != record.tier() => wanted.push((record.coord(), target)),
                _ => {}
            }
        }

        for (coord, tier) in wanted {
            match self.submit(coord, tier) {
                Ok(ticket) => {
                    if let Some(Slot::Resident(record)) = self.slots.get_mut(&coord) {
                        record.pending_lod = Some(PendingLod { tier, ticket });
                    }
                }
                // Keep the current geometry and retry next frame
                Err(_) => break,
            }
        }
    }

    fn integrate(&mut self, report: &mut UpdateReport, quota: &mut usize, deadline: Instant) {
        if *quota == 0 {
            return;
        }
        let budget = deadline.saturating_duration_since(Instant::now());
        let results = self.backend.poll(*quota, budget);
        *quota -= results.len().min(*quota);

        for result in results {
            self.integrate_one(result, report);
        }
    }

    fn integrate_one(&mut self, result: SynthesisResult, report: &mut UpdateReport) {
        let SynthesisResult {
            ticket,
            coord,
            tier,
            buffer,
            outcome,
            elapsed,
        } = result;
        report.synthesis_times.push(elapsed);

        match self.slots.get_mut(&coord) {
            Some(Slot::Pending {
                ticket: expected, ..
            }) if *expected == ticket => match outcome {
                Ok(()) => {
                    self.slots
                        .insert(coord, Slot::Resident(ChunkRecord::new(coord, tier, buffer)));
                    report.admitted += 1;
                }
                Err(error) => {
                    tracing::debug!(%coord, %error, "chunk synthesis failed");
                    self.slots.remove(&coord);
                    self.pool.release(buffer);
                    report.failed += 1;
                }
            },
            Some(Slot::Resident(record))
                if record.pending_lod.is_some_and(|pending| pending.ticket == ticket) =>
            {
                match outcome {
                    Ok(()) => {
                        let old = record.replace_geometry(tier, buffer);
                        self.pool.release(old);
                        report.lod_changed += 1;
                        report.invalidated.push(coord);
                    }
                    Err(error) => {
                        tracing::debug!(%coord, %error, "LOD re-synthesis failed");
                        record.pending_lod = None;
                        self.pool.release(buffer);
                        report.failed += 1;
                    }
                }
            }
            _ => {
                report.discarded += 1;
                self.pool.release(buffer);
            }
        }
    }
}

impl Drop for ChunkStore {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::lod::{LodTable, LodTier};
    use crate::utils::settings::TerrainSettings;
    use crate::world::loader::{ChunkLoader, InlineSynthesizer, RejectedJob};
    use std::sync::atomic::{AtomicBool, Ordering};

    const SIZE: f64 = 64.0;

    fn generator() -> Arc<TerrainGenerator> {
        Arc::new(TerrainGenerator::new(2137, &TerrainSettings::default()))
    }

    fn small_table() -> LodTable {
        LodTable {
            tiers: vec![
                LodTier::new(100.0, 9, 0),
                LodTier::new(200.0, 5, 1),
                LodTier::new(10_000.0, 3, 2),
            ],
        }
    }

    fn store_with(
        view_distance: u32,
        capacity: usize,
        backend: Box<dyn SynthesisBackend>,
    ) -> ChunkStore {
        let settings = StreamingSettings {
            chunk_size: SIZE,
            view_distance,
            capacity,
            max_results_per_frame: 10_000,
            result_time_budget_ms: 10_000.0,
            ..StreamingSettings::default()
        };
        let lod = LodSelector::new(small_table(), 8.0).unwrap();
        ChunkStore::new(&settings, lod, Arc::new(GeometryPool::new(64)), backend)
    }

    fn inline_store(view_distance: u32, capacity: usize) -> ChunkStore {
        store_with(view_distance, capacity, Box::new(InlineSynthesizer::new(generator())))
    }

    fn at(x: f64, z: f64) -> DVec2 {
        DVec2::new(x, z)
    }

    fn assert_pool_conserved(store: &ChunkStore) {
        let stats = store.pool().stats();
        assert_eq!(stats.in_use + stats.idle + stats.destroyed, stats.allocated);
    }

    #[test]
    fn test_fills_window_nearest_first() {
        let mut store = inline_store(2, 100);
        let report = store.update(at(32.0, 32.0));
        assert_eq!(report.admitted, 13);
        assert_eq!(store.resident_count(), 13);
        assert_eq!(store.pending_count(), 0);
        assert!(matches!(
            store.state(ChunkCoord::new(0, 0)),
            ChunkState::Resident { tier: 0 }
        ));
        assert_eq!(store.state(ChunkCoord::new(2, 2)), ChunkState::Absent);
        assert_pool_conserved(&store);
    }

    #[test]
    fn test_capacity_churn() {
        let mut store = inline_store(3, 5);
        let report = store.update(at(32.0, 32.0));
        assert_eq!(store.resident_count(), 5);
        assert!(report.skipped > 0);

        // The five nearest chunks win
        for coord in [
            ChunkCoord::new(0, 0),
            ChunkCoord::new(-1, 0),
            ChunkCoord::new(1, 0),
            ChunkCoord::new(0, -1),
            ChunkCoord::new(0, 1),
        ] {
            assert!(store.record(coord).is_some(), "{} missing", coord);
        }

        for step in 0..30 {
            store.update(at(32.0 + step as f64 * 40.0, 32.0));
            assert!(store.resident_count() <= 5);
            assert_pool_conserved(&store);
        }
    }

    /// Inline backend that refuses every job while `reject` is set.
    struct GatedBackend {
        inner: InlineSynthesizer,
        reject: Arc<AtomicBool>,
    }

    impl SynthesisBackend for GatedBackend {
        fn submit(&mut self, job: SynthesisJob) -> Result<(), RejectedJob> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(RejectedJob {
                    job,
                    reason: SynthesisError::QueueFull,
                });
            }
            self.inner.submit(job)
        }

        fn poll(&mut self, max: usize, budget: Duration) -> Vec<SynthesisResult> {
            self.inner.poll(max, budget)
        }

        fn in_flight(&self) -> usize {
            self.inner.in_flight()
        }

        fn drain(&mut self) -> Vec<SynthesisResult> {
            self.inner.drain()
        }

        fn set_generator(&mut self, generator: Arc<TerrainGenerator>) {
            self.inner.set_generator(generator);
        }

        fn worker_count(&self) -> usize {
            self.inner.worker_count()
        }
    }

    #[test]
    fn test_closer_chunk_displaces_farthest_at_capacity() {
        let mut store = inline_store(3, 5);
        store.update(at(32.0, 32.0));
        let farthest = ChunkCoord::new(-1, 0);
        assert!(store.record(farthest).is_some());
        assert_eq!(store.state(ChunkCoord::new(2, 0)), ChunkState::Absent);

        // (-1, 0) stays inside the window at 152 away while absent (2, 0) is 40 away
        let report = store.update(at(120.0, 32.0));

        assert!(report.evicted >= 1);
        assert_eq!(report.admitted, report.evicted);
        assert!(report.invalidated.contains(&farthest));
        assert!(store.record(farthest).is_none());
        assert!(store.record(ChunkCoord::new(2, 0)).is_some());
        assert_eq!(store.resident_count(), 5);
        assert_pool_conserved(&store);
    }

    #[test]
    fn test_equal_distance_does_not_displace() {
        let mut store = inline_store(3, 3);
        store.update(at(32.0, 32.0));
        let before: FxHashSet<ChunkCoord> = store.records().map(|r| r.coord()).collect();
        assert_eq!(before.len(), 3);

        // The two absent neighbours tie with the farthest resident
        let report = store.update(at(32.0, 32.0));
        assert_eq!(report.evicted, 0);
        assert_eq!(report.admitted, 0);
        assert!(report.skipped >= 2);
        let after: FxHashSet<ChunkCoord> = store.records().map(|r| r.coord()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_rejected_submission_keeps_victim() {
        let reject = Arc::new(AtomicBool::new(false));
        let backend = GatedBackend {
            inner: InlineSynthesizer::new(generator()),
            reject: Arc::clone(&reject),
        };
        let mut store = store_with(3, 5, Box::new(backend));
        store.update(at(32.0, 32.0));
        assert_eq!(store.resident_count(), 5);

        reject.store(true, Ordering::SeqCst);
        let report = store.update(at(96.0, 32.0));
        assert_eq!(report.evicted, 0);
        assert_eq!(report.admitted, 0);
        assert!(report.skipped > 0);
        assert_eq!(store.resident_count(), 5);
        assert!(store.record(ChunkCoord::new(-1, 0)).is_some());
        assert_pool_conserved(&store);

        reject.store(false, Ordering::SeqCst);
        let report = store.update(at(96.0, 32.0));
        assert!(report.admitted > 0);
        assert_eq!(report.admitted, report.evicted);
        assert_eq!(store.resident_count(), 5);
        assert_pool_conserved(&store);
    }

    #[test]
    fn test_viewpoint_at_grid_edge_does_not_panic() {
        let mut store = inline_store(2, 100);
        let report = store.update(at(1.0e12, 1.0e12));
        let desired = store.desired_set(at(1.0e12, 1.0e12));
        let unique: FxHashSet<ChunkCoord> = desired.iter().map(|(_, c)| *c).collect();
        assert_eq!(unique.len(), desired.len());
        assert_eq!(store.resident_count(), desired.len());
        assert_eq!(report.admitted, desired.len());
        assert!(store.record(ChunkCoord::new(i32::MAX, i32::MAX)).is_some());
    }

    #[test]
    fn test_eviction_correctness() {
        let mut store = inline_store(2, 100);
        store.update(at(0.0, 0.0));
        let report = store.update(at(10_000.0, 10_000.0));
        assert_eq!(report.evicted, 13);
        let center = ChunkCoord::from_world(at(10_000.0, 10_000.0), SIZE);
        for record in store.records() {
            let dx = (record.coord().cx - center.cx) as i64;
            let dz = (record.coord().cz - center.cz) as i64;
            assert!(dx * dx + dz * dz <= 4);
        }
        assert_eq!(store.resident_count(), 13);
        assert_pool_conserved(&store);
    }

    #[test]
    fn test_capacity_invariant_under_random_walk() {
        let mut store = inline_store(4, 20);
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 2001) as f64 / 1000.0 - 1.0
        };

        let mut position = at(0.0, 0.0);
        for _ in 0..200 {
            position += DVec2::new(next(), next()) * 150.0;
            store.update(position);
            assert!(store.resident_count() <= store.capacity());
            assert!(store.resident_count() + store.pending_count() <= store.capacity());
        }
        assert_pool_conserved(&store);
    }

    #[test]
    fn test_lod_swap_returns_buffer_to_pool() {
        let mut store = inline_store(4, 100);
        let coord = ChunkCoord::new(1, 0);
        // Chunk center (96, 32) is 16 from (80, 32): finest tier
        store.update(at(80.0, 32.0));
        assert_eq!(store.state(coord), ChunkState::Resident { tier: 0 });
        let revision = store.record(coord).unwrap().revision();
        let idle_before = store.pool().idle_count(9);

        // 116 from (-20, 32): past the first boundary by more than the margin
        let report = store.update(at(-20.0, 32.0));
        assert_eq!(store.state(coord), ChunkState::Resident { tier: 1 });
        assert!(report.invalidated.contains(&coord));
        let record = store.record(coord).unwrap();
        assert_eq!(record.resolution(), 5);
        assert_eq!(record.revision(), revision + 1);
        assert!(store.pool().idle_count(9) >= idle_before + 1);
        assert_pool_conserved(&store);
    }

    #[test]
    fn test_lod_hysteresis_holds_near_boundary() {
        let mut store = inline_store(4, 100);
        let coord = ChunkCoord::new(1, 0);
        store.update(at(80.0, 32.0));
        // 104 from the center: past 100 but inside the margin
        store.update(at(-8.0, 32.0));
        assert_eq!(store.state(coord), ChunkState::Resident { tier: 0 });
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut store = inline_store(1, 100);
        store.set_result_limits(0, Duration::ZERO);
        store.update(at(32.0, 32.0));
        assert_eq!(store.pending_count(), 5);
        assert_eq!(store.resident_count(), 0);

        // Move far away: the pending chunks are cancelled, their results go stale
        store.set_result_limits(10_000, Duration::from_secs(10));
        let report = store.update(at(50_000.0, 50_000.0));
        assert_eq!(report.cancelled, 5);
        assert_eq!(report.discarded, 5);
        assert!(store.records().all(|r| r.coord().distance_to(at(50_000.0, 50_000.0), SIZE) < 200.0));
        assert_pool_conserved(&store);
    }

    #[test]
    fn test_set_capacity_evicts_farthest() {
        let mut store = inline_store(2, 100);
        store.update(at(32.0, 32.0));
        let report = store.set_capacity(5);
        assert_eq!(report.evicted, 8);
        assert_eq!(store.resident_count(), 5);
        assert!(store.record(ChunkCoord::new(0, 0)).is_some());
        assert!(store.record(ChunkCoord::new(2, 0)).is_none());
    }

    #[test]
    fn test_ensure_resident() {
        let mut store = inline_store(2, 100);
        let coord = ChunkCoord::new(40, 40);
        let (state, report) = store.ensure_resident(coord, at(0.0, 0.0));
        assert_eq!(state, ChunkState::Resident { tier: 2 });
        assert_eq!(report.admitted, 1);
    }

    #[test]
    fn test_regenerate_evicts_everything() {
        let mut store = inline_store(2, 100);
        store.update(at(32.0, 32.0));
        let before: Vec<u8> = store.record(ChunkCoord::new(0, 0)).unwrap().geometry().vertex_bytes().to_vec();

        let other = Arc::new(TerrainGenerator::new(4242, &TerrainSettings::default()));
        let report = store.regenerate(other);
        assert_eq!(report.evicted, 13);
        assert_eq!(store.resident_count(), 0);

        store.update(at(32.0, 32.0));
        let after = store.record(ChunkCoord::new(0, 0)).unwrap().geometry().vertex_bytes();
        assert_ne!(before.as_slice(), after);
        assert_pool_conserved(&store);
    }

    #[test]
    fn test_worker_backend_matches_inline() {
        let mut inline = inline_store(2, 100);
        let mut threaded = store_with(2, 100, Box::new(ChunkLoader::new(generator(), 2, 64, 64)));
        let viewpoint = at(32.0, 32.0);
        inline.update(viewpoint);

        let deadline = Instant::now() + Duration::from_secs(30);
        threaded.update(viewpoint);
        while threaded.resident_count() < 13 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            threaded.update(viewpoint);
        }

        assert_eq!(threaded.resident_count(), 13);
        for record in inline.records() {
            let other = threaded.record(record.coord()).unwrap();
            assert_eq!(record.tier(), other.tier());
            assert_eq!(record.geometry().vertex_bytes(), other.geometry().vertex_bytes());
        }
    }
}
