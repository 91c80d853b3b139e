//! Distance-based level-of-detail tiers.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_RESOLUTION, MIN_RESOLUTION};
use crate::error::ConfigError;
use crate::utils::settings::DeviceClass;

/// One LOD tier: chunks closer than `max_distance` use `resolution` vertices per edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodTier {
    pub max_distance: f64,
    pub resolution: u32,
    pub material_tier: u8,
}

impl LodTier {
    pub const fn new(max_distance: f64, resolution: u32, material_tier: u8) -> Self {
        LodTier {
            max_distance,
            resolution,
            material_tier,
        }
    }
}

/// Ordered tier table, finest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodTable {
    pub tiers: Vec<LodTier>,
}

impl Default for LodTable {
    fn default() -> Self {
        Self::desktop()
    }
}

impl LodTable {
    pub fn desktop() -> Self {
        LodTable {
            tiers: vec![
                LodTier::new(160.0, 65, 0),
                LodTier::new(320.0, 33, 1),
                LodTier::new(640.0, 17, 2),
                LodTier::new(1024.0, 9, 3),
            ],
        }
    }

    pub fn mobile() -> Self {
        LodTable {
            tiers: vec![
                LodTier::new(96.0, 33, 0),
                LodTier::new(224.0, 17, 1),
                LodTier::new(448.0, 9, 2),
                LodTier::new(768.0, 5, 3),
            ],
        }
    }

    pub fn for_device(device: DeviceClass) -> Self {
        match device {
            DeviceClass::Desktop => Self::desktop(),
            DeviceClass::Mobile => Self::mobile(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiers.is_empty() {
            return Err(ConfigError::EmptyLodTable);
        }

        for (index, tier) in self.tiers.iter().enumerate() {
            if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&tier.resolution) {
                return Err(ConfigError::ResolutionOutOfRange {
                    index,
                    resolution: tier.resolution,
                    min: MIN_RESOLUTION,
                    max: MAX_RESOLUTION,
                });
            }
            if tier.max_distance.is_nan() || tier.max_distance <= 0.0 {
                return Err(ConfigError::invalid(
                    "lod.max_distance",
                    format!("tier {} has bound {}", index, tier.max_distance),
                ));
            }
            if index == 0 {
                continue;
            }
            let previous = self.tiers[index - 1];
            if tier.max_distance <= previous.max_distance {
                return Err(ConfigError::UnorderedLodBounds {
                    index,
                    bound: tier.max_distance,
                    previous: previous.max_distance,
                });
            }
            if tier.resolution > previous.resolution {
                return Err(ConfigError::IncreasingLodResolution {
                    index,
                    resolution: tier.resolution,
                    previous: previous.resolution,
                });
            }
        }
        Ok(())
    }
}

/// Maps viewpoint distance to a tier. Stateless apart from the table.
#[derive(Clone, Debug)]
pub struct LodSelector {
    table: LodTable,
    hysteresis: f64,
}

impl LodSelector {
    pub fn new(table: LodTable, hysteresis: f64) -> Result<Self, ConfigError> {
        table.validate()?;
        if !hysteresis.is_finite() || hysteresis < 0.0 {
            return Err(ConfigError::invalid(
                "streaming.lod_hysteresis",
                format!("{} is not a non-negative distance", hysteresis),
            ));
        }
        Ok(LodSelector { table, hysteresis })
    }

    pub fn table(&self) -> &LodTable {
        &self.table
    }

    pub fn tier(&self, index: usize) -> LodTier {
        self.table.tiers[index.min(self.coarsest_index())]
    }

    pub fn coarsest_index(&self) -> usize {
        self.table.tiers.len() - 1
    }

    /// First tier whose bound exceeds `distance`, else the coarsest.
    pub fn select_index(&self, distance: f64) -> usize {
        self.table
            .tiers
            .iter()
            .position(|tier| distance < tier.max_distance)
            .unwrap_or_else(|| self.coarsest_index())
    }

    pub fn select(&self, distance: f64) -> LodTier {
        self.tier(self.select_index(distance))
    }

    /// Like `select_index`, but keeps `current` until the distance clears the
    /// boundary between the two tiers by the hysteresis margin.
    pub fn select_index_with_hysteresis(&self, distance: f64, current: usize) -> usize {
        let target = self.select_index(distance);
        if target == current || current > self.coarsest_index() {
            return target;
        }

        if target > current {
            let boundary = self.table.tiers[current].max_distance;
            if distance >= boundary + self.hysteresis {
                target
            } else {
                current
            }
        } else {
            let boundary = self.table.tiers[current - 1].max_distance;
            if distance < boundary - self.hysteresis {
                target
            } else {
                current
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_table_lookup() {
        let lod = LodSelector::new(LodTable::desktop(), 0.0).unwrap();
        assert_eq!(lod.select(0.0).resolution, 65);
        assert_eq!(lod.select(159.9).resolution, 65);
        assert_eq!(lod.select(160.0).resolution, 33);
        assert_eq!(lod.select(700.0).material_tier, 3);
        // Beyond the last bound falls back to the coarsest tier
        assert_eq!(lod.select(1.0e9).resolution, 9);
        assert_eq!(lod.select(f64::NAN).resolution, 9);
    }

    #[test]
    fn test_resolution_monotonic_for_presets() {
        for table in [LodTable::desktop(), LodTable::mobile()] {
            let lod = LodSelector::new(table, 0.0).unwrap();
            let mut previous = u32::MAX;
            let mut d = 0.0;
            while d < 2000.0 {
                let res = lod.select(d).resolution;
                assert!(res <= previous, "resolution grew at distance {}", d);
                previous = res;
                d += 3.7;
            }
        }
    }

    #[test]
    fn test_hysteresis_prevents_flapping() {
        let lod = LodSelector::new(LodTable::desktop(), 10.0).unwrap();
        // Just past the 160 boundary: stays fine until 170
        assert_eq!(lod.select_index_with_hysteresis(165.0, 0), 0);
        assert_eq!(lod.select_index_with_hysteresis(171.0, 0), 1);
        // Coming back: stays coarse until below 150
        assert_eq!(lod.select_index_with_hysteresis(155.0, 1), 1);
        assert_eq!(lod.select_index_with_hysteresis(149.0, 1), 0);
        // Large jumps are not held back
        assert_eq!(lod.select_index_with_hysteresis(900.0, 0), 3);
    }

    #[test]
    fn test_validate_rejects_malformed_tables() {
        assert_eq!(
            LodTable { tiers: vec![] }.validate(),
            Err(ConfigError::EmptyLodTable)
        );

        let unordered = LodTable {
            tiers: vec![LodTier::new(100.0, 33, 0), LodTier::new(50.0, 17, 1)],
        };
        assert!(matches!(
            unordered.validate(),
            Err(ConfigError::UnorderedLodBounds { index: 1, .. })
        ));

        let finer_far = LodTable {
            tiers: vec![LodTier::new(100.0, 17, 0), LodTier::new(200.0, 33, 1)],
        };
        assert!(matches!(
            finer_far.validate(),
            Err(ConfigError::IncreasingLodResolution { index: 1, .. })
        ));

        let too_coarse = LodTable {
            tiers: vec![LodTier::new(100.0, 1, 0)],
        };
        assert!(matches!(
            too_coarse.validate(),
            Err(ConfigError::ResolutionOutOfRange { .. })
        ));
    }
}
