use std::fmt;

use glam::DVec2;

/// Integer chunk grid coordinate. World origin is `(cx * S, cz * S)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    pub const fn new(cx: i32, cz: i32) -> Self {
        ChunkCoord { cx, cz }
    }

    /// Chunk containing the world-space point.
    pub fn from_world(position: DVec2, chunk_size: f64) -> Self {
        ChunkCoord {
            cx: (position.x / chunk_size).floor() as i32,
            cz: (position.y / chunk_size).floor() as i32,
        }
    }

    pub fn origin(self, chunk_size: f64) -> DVec2 {
        DVec2::new(self.cx as f64 * chunk_size, self.cz as f64 * chunk_size)
    }

    pub fn center(self, chunk_size: f64) -> DVec2 {
        self.origin(chunk_size) + DVec2::splat(chunk_size * 0.5)
    }

    /// Horizontal distance from `position` to the chunk center.
    pub fn distance_to(self, position: DVec2, chunk_size: f64) -> f64 {
        self.center(chunk_size).distance(position)
    }

    /// Saturates at the edge of the `i32` grid.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        ChunkCoord::new(self.cx.saturating_add(dx), self.cz.saturating_add(dz))
    }

    /// Coordinates inside the circle `dx² + dz² <= radius²` around `self`.
    /// Near the edge of the grid saturated offsets can repeat a coordinate.
    pub fn window(self, radius: i32) -> impl Iterator<Item = ChunkCoord> {
        let radius = radius.max(0);
        let radius_sq = radius as i64 * radius as i64;
        (-radius..=radius).flat_map(move |dz| {
            (-radius..=radius).filter_map(move |dx| {
                let dist_sq = dx as i64 * dx as i64 + dz as i64 * dz as i64;
                (dist_sq <= radius_sq).then(|| self.offset(dx, dz))
            })
        })
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cx, self.cz)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from((cx, cz): (i32, i32)) -> Self {
        ChunkCoord::new(cx, cz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world_floors_negative_positions() {
        assert_eq!(
            ChunkCoord::from_world(DVec2::new(-0.5, 63.9), 64.0),
            ChunkCoord::new(-1, 0)
        );
        assert_eq!(
            ChunkCoord::from_world(DVec2::new(64.0, -64.0), 64.0),
            ChunkCoord::new(1, -1)
        );
    }

    #[test]
    fn test_window_is_circular() {
        let center = ChunkCoord::new(3, -2);
        let coords: Vec<_> = center.window(2).collect();
        // 5x5 square minus the 4 corners and the 8 cells at distance sqrt(5)
        assert_eq!(coords.len(), 13);
        assert!(coords.contains(&center.offset(2, 0)));
        assert!(!coords.contains(&center.offset(2, 1)));
        assert!(!coords.contains(&center.offset(2, 2)));
        assert_eq!(center.window(0).collect::<Vec<_>>(), vec![center]);
    }

    #[test]
    fn test_window_at_grid_edge_saturates() {
        let far = ChunkCoord::from_world(DVec2::new(1.0e12, -1.0e12), 64.0);
        assert_eq!(far, ChunkCoord::new(i32::MAX, i32::MIN));
        let coords: Vec<_> = far.window(2).collect();
        assert_eq!(coords.len(), 13);
        assert!(coords.iter().all(|c| c.cx >= i32::MAX - 2 && c.cz <= i32::MIN + 2));
        assert_eq!(far.offset(1, -1), far);
    }
}
