//! Per-frame frustum culling of resident chunks.
//!
//! Bounding spheres are computed once per chunk geometry and cached by
//! coordinate together with the geometry revision they were built from.

use std::collections::VecDeque;

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::app::interfaces::CameraFrustumSource;
use crate::core::{ChunkCoord, ChunkRecord};
use crate::render::frustum::{BoundingSphere, Frustum};

struct CachedSphere {
    revision: u64,
    sphere: BoundingSphere,
    inserted_at: u64,
}

/// Bounding-sphere cache with a soft size cap, evicted oldest-first.
pub struct SphereCache {
    entries: FxHashMap<ChunkCoord, CachedSphere>,
    order: VecDeque<(ChunkCoord, u64)>,
    soft_cap: usize,
    seq: u64,
}

impl SphereCache {
    pub fn new(soft_cap: usize) -> Self {
        SphereCache {
            entries: FxHashMap::default(),
            order: VecDeque::new(),
            soft_cap,
            seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.entries.contains_key(&coord)
    }

    /// Cached sphere for this revision, computing it on a miss or a stale entry.
    pub fn get_or_compute<F>(&mut self, coord: ChunkCoord, revision: u64, compute: F) -> BoundingSphere
    where
        F: FnOnce() -> BoundingSphere,
    {
        if let Some(cached) = self.entries.get(&coord) {
            if cached.revision == revision {
                return cached.sphere;
            }
        }

        let sphere = compute();
        self.seq += 1;
        self.entries.insert(
            coord,
            CachedSphere {
                revision,
                sphere,
                inserted_at: self.seq,
            },
        );
        self.order.push_back((coord, self.seq));
        self.enforce_cap();
        sphere
    }

    pub fn invalidate(&mut self, coord: ChunkCoord) {
        self.entries.remove(&coord);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn enforce_cap(&mut self) {
        while self.entries.len() > self.soft_cap {
            let Some((coord, seq)) = self.order.pop_front() else {
                break;
            };
            if self.entries.get(&coord).is_some_and(|e| e.inserted_at == seq) {
                self.entries.remove(&coord);
            }
        }

        // Drop stale order entries left behind by invalidations and recomputes
        if self.order.len() > self.entries.len() * 2 + 16 {
            let entries = &self.entries;
            self.order
                .retain(|(coord, seq)| entries.get(coord).is_some_and(|e| e.inserted_at == *seq));
        }
    }
}

/// Toggles chunk visibility against the camera frustum without touching geometry.
pub struct VisibilityCuller {
    enabled: bool,
    cache: SphereCache,
    frustum: Option<Frustum>,
    visible_count: usize,
}

impl VisibilityCuller {
    pub fn new(enabled: bool, cache_soft_cap: usize) -> Self {
        VisibilityCuller {
            enabled,
            cache: SphereCache::new(cache_soft_cap),
            frustum: None,
            visible_count: 0,
        }
    }

    pub fn is_visible(sphere: &BoundingSphere, frustum: &Frustum) -> bool {
        frustum.intersects_sphere(sphere)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Rebuild the frustum from the camera. Called once per frame.
    pub fn begin_frame<C: CameraFrustumSource + ?Sized>(&mut self, camera: &C) {
        self.frustum = Some(Frustum::from_matrices(
            camera.projection(),
            camera.camera_world(),
        ));
    }

    pub fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    /// Drop cache entries for chunks that were evicted or re-meshed.
    pub fn forget(&mut self, coords: &[ChunkCoord]) {
        for coord in coords {
            self.cache.invalidate(*coord);
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &SphereCache {
        &self.cache
    }

    /// World-space bounding sphere of a record, cached per geometry revision.
    pub fn bounding_sphere(&mut self, record: &ChunkRecord, chunk_size: f64) -> BoundingSphere {
        self.cache
            .get_or_compute(record.coord(), record.revision(), || world_sphere(record, chunk_size))
    }

    /// Update the visibility flag of every record. Returns the visible count.
    pub fn update<'a, I>(&mut self, records: I, chunk_size: f64) -> usize
    where
        I: IntoIterator<Item = &'a mut ChunkRecord>,
    {
        let mut visible = 0;
        for record in records {
            record.visible = match (self.enabled, self.frustum) {
                (true, Some(frustum)) => {
                    let sphere = self.bounding_sphere(record, chunk_size);
                    Self::is_visible(&sphere, &frustum)
                }
                _ => true,
            };
            if record.visible {
                visible += 1;
            }
        }
        self.visible_count = visible;
        visible
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }
}

fn world_sphere(record: &ChunkRecord, chunk_size: f64) -> BoundingSphere {
    let origin = record.coord().origin(chunk_size);
    let offset = Vec3::new(origin.x as f32, 0.0, origin.y as f32);
    let points = record
        .geometry()
        .vertices()
        .iter()
        .map(|v| Vec3::from_array(v.position));

    BoundingSphere::from_points(points)
        .unwrap_or_else(|| BoundingSphere::new(Vec3::ZERO, chunk_size as f32))
        .translated(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_sphere(x: f32) -> BoundingSphere {
        BoundingSphere::new(Vec3::new(x, 0.0, 0.0), 1.0)
    }

    #[test]
    fn test_cache_reuses_until_revision_changes() {
        let mut cache = SphereCache::new(8);
        let coord = ChunkCoord::new(1, 2);
        let mut computed = 0;

        for _ in 0..3 {
            cache.get_or_compute(coord, 0, || {
                computed += 1;
                unit_sphere(0.0)
            });
        }
        assert_eq!(computed, 1);

        let sphere = cache.get_or_compute(coord, 1, || {
            computed += 1;
            unit_sphere(5.0)
        });
        assert_eq!(computed, 2);
        assert_eq!(sphere.center.x, 5.0);
    }

    #[test]
    fn test_cache_soft_cap_evicts_oldest() {
        let mut cache = SphereCache::new(2);
        cache.get_or_compute(ChunkCoord::new(0, 0), 0, || unit_sphere(0.0));
        cache.get_or_compute(ChunkCoord::new(1, 0), 0, || unit_sphere(1.0));
        cache.get_or_compute(ChunkCoord::new(2, 0), 0, || unit_sphere(2.0));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(ChunkCoord::new(0, 0)));
        assert!(cache.contains(ChunkCoord::new(2, 0)));
    }

    #[test]
    fn test_invalidate_drops_entry() {
        let mut cache = SphereCache::new(4);
        let coord = ChunkCoord::new(0, 0);
        cache.get_or_compute(coord, 0, || unit_sphere(0.0));
        cache.invalidate(coord);
        assert!(cache.is_empty());
    }
}
