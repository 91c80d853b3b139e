//! Reusable geometry buffers bucketed by LOD resolution.
//!
//! Chunk creation and LOD swaps acquire a buffer sized for the requested
//! resolution and hand it back on eviction, so steady-state streaming does not
//! allocate. The idle list is capped; over-budget buffers are destroyed.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::core::vertex::TerrainVertex;

/// Fixed-topology vertex/index storage for one `resolution x resolution` grid.
pub struct GeometryBuffer {
    id: u64,
    resolution: u32,
    vertices: Vec<TerrainVertex>,
    indices: Vec<u32>,
}

impl GeometryBuffer {
    fn allocate(id: u64, resolution: u32) -> Self {
        let res = resolution as usize;
        GeometryBuffer {
            id,
            resolution,
            vertices: vec![TerrainVertex::default(); res * res],
            indices: grid_indices(resolution),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [TerrainVertex] {
        &mut self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex at grid position `(i, j)`; `i` runs along X, `j` along Z.
    pub fn vertex(&self, i: usize, j: usize) -> &TerrainVertex {
        &self.vertices[j * self.resolution as usize + i]
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Two counter-clockwise (seen from +Y) triangles per grid cell.
fn grid_indices(resolution: u32) -> Vec<u32> {
    let segments = resolution.saturating_sub(1);
    let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
    for j in 0..segments {
        for i in 0..segments {
            let a = j * resolution + i;
            let b = a + 1;
            let c = a + resolution;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    indices
}

/// Pool counters. `in_use + idle + destroyed == allocated` at all times.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub hits: u64,
    pub misses: u64,
    pub allocated: u64,
    pub destroyed: u64,
    pub in_use: u64,
    pub idle: u64,
}

impl PoolStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct IdleBuffer {
    buffer: GeometryBuffer,
    released_at: u64,
}

struct PoolState {
    buckets: FxHashMap<u32, VecDeque<IdleBuffer>>,
    idle_budget: usize,
    next_id: u64,
    release_seq: u64,
    stats: PoolStats,
}

impl PoolState {
    fn idle_count(&self) -> usize {
        self.stats.idle as usize
    }

    /// Destroy the oldest idle buffers across all buckets until within budget.
    fn trim_to_budget(&mut self) {
        while self.idle_count() > self.idle_budget {
            let oldest = self
                .buckets
                .iter()
                .filter_map(|(res, bucket)| bucket.front().map(|b| (*res, b.released_at)))
                .min_by_key(|(_, seq)| *seq)
                .map(|(res, _)| res);

            let Some(resolution) = oldest else {
                break;
            };
            if let Some(bucket) = self.buckets.get_mut(&resolution) {
                bucket.pop_front();
                self.stats.idle -= 1;
                self.stats.destroyed += 1;
            }
        }
    }
}

/// Thread-safe free lists of geometry buffers, one bucket per resolution.
pub struct GeometryPool {
    state: Mutex<PoolState>,
}

impl GeometryPool {
    pub fn new(idle_budget: usize) -> Self {
        GeometryPool {
            state: Mutex::new(PoolState {
                buckets: FxHashMap::default(),
                idle_budget,
                next_id: 0,
                release_seq: 0,
                stats: PoolStats::default(),
            }),
        }
    }

    /// Reuse an idle buffer of this resolution (hit) or allocate one (miss).
    pub fn acquire(&self, resolution: u32) -> GeometryBuffer {
        let mut state = self.state.lock();
        let reused = state
            .buckets
            .get_mut(&resolution)
            .and_then(|bucket| bucket.pop_back());

        let buffer = match reused {
            Some(idle) => {
                state.stats.hits += 1;
                state.stats.idle -= 1;
                idle.buffer
            }
            None => {
                state.stats.misses += 1;
                state.stats.allocated += 1;
                let id = state.next_id;
                state.next_id += 1;
                GeometryBuffer::allocate(id, resolution)
            }
        };
        state.stats.in_use += 1;
        buffer
    }

    /// Return a buffer. Destroyed immediately if the idle budget is full.
    pub fn release(&self, buffer: GeometryBuffer) {
        let mut state = self.state.lock();
        state.stats.in_use = state.stats.in_use.saturating_sub(1);

        if state.idle_count() >= state.idle_budget {
            state.stats.destroyed += 1;
            drop(buffer);
            return;
        }

        state.release_seq += 1;
        let released_at = state.release_seq;
        state
            .buckets
            .entry(buffer.resolution())
            .or_default()
            .push_back(IdleBuffer {
                buffer,
                released_at,
            });
        state.stats.idle += 1;
    }

    pub fn idle_budget(&self) -> usize {
        self.state.lock().idle_budget
    }

    pub fn set_idle_budget(&self, budget: usize) {
        let mut state = self.state.lock();
        state.idle_budget = budget;
        state.trim_to_budget();
    }

    pub fn idle_count(&self, resolution: u32) -> usize {
        self.state
            .lock()
            .buckets
            .get(&resolution)
            .map_or(0, VecDeque::len)
    }

    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_conserved(pool: &GeometryPool) {
        let s = pool.stats();
        assert_eq!(s.in_use + s.idle + s.destroyed, s.allocated, "{:?}", s);
    }

    #[test]
    fn test_acquire_release_hits_and_misses() {
        let pool = GeometryPool::new(8);
        let a = pool.acquire(17);
        let b = pool.acquire(33);
        assert_eq!(a.resolution(), 17);
        assert_eq!(a.vertices().len(), 17 * 17);
        assert_eq!(a.indices().len(), 16 * 16 * 6);
        assert_eq!(pool.stats().misses, 2);

        let a_id = a.id();
        pool.release(a);
        assert_eq!(pool.idle_count(17), 1);
        assert_eq!(pool.idle_count(33), 0);

        let again = pool.acquire(17);
        assert_eq!(again.id(), a_id);
        assert_eq!(pool.stats().hits, 1);
        assert!((pool.stats().hit_rate() - 1.0 / 3.0).abs() < 1e-9);

        pool.release(again);
        pool.release(b);
        assert_conserved(&pool);
    }

    #[test]
    fn test_release_over_budget_destroys() {
        let pool = GeometryPool::new(1);
        let a = pool.acquire(9);
        let b = pool.acquire(9);
        pool.release(a);
        pool.release(b);
        let s = pool.stats();
        assert_eq!(s.idle, 1);
        assert_eq!(s.destroyed, 1);
        assert_conserved(&pool);
    }

    #[test]
    fn test_shrinking_budget_trims_oldest_first() {
        let pool = GeometryPool::new(4);
        let a = pool.acquire(9);
        let b = pool.acquire(17);
        let c = pool.acquire(9);
        pool.release(a);
        pool.release(b);
        pool.release(c);

        pool.set_idle_budget(1);
        // The 9-buffer released first and the 17-buffer are gone.
        assert_eq!(pool.idle_count(9), 1);
        assert_eq!(pool.idle_count(17), 0);
        assert_eq!(pool.stats().destroyed, 2);
        assert_conserved(&pool);
    }

    #[test]
    fn test_conservation_under_churn() {
        let pool = GeometryPool::new(3);
        let mut held = Vec::new();
        for round in 0..50u32 {
            let res = [5, 9, 17][(round % 3) as usize];
            held.push(pool.acquire(res));
            if round % 4 == 3 {
                for buffer in held.drain(..2) {
                    pool.release(buffer);
                }
            }
            assert_conserved(&pool);
        }
        for buffer in held {
            pool.release(buffer);
        }
        assert_conserved(&pool);
        assert_eq!(pool.stats().in_use, 0);
    }

    #[test]
    fn test_grid_indices_wind_consistently() {
        let indices = grid_indices(3);
        assert_eq!(indices, vec![0, 3, 1, 1, 3, 4, 1, 4, 2, 2, 4, 5, 3, 6, 4, 4, 6, 7, 4, 7, 5, 5, 7, 8]);
    }
}
