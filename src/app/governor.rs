//! Frame-time driven budget control.
//!
//! The governor watches a rolling window of frame times and, once per
//! evaluation interval, shrinks or grows the chunk capacity and the
//! geometry pool idle budget.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::core::ChunkCoord;
use crate::error::ConfigError;
use crate::utils::settings::DeviceClass;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GovernorSettings {
    pub enabled: bool,
    pub window: usize,
    /// Seconds of accumulated frame time between evaluations.
    pub evaluation_interval: f64,
    pub slow_frame_ms: f64,
    pub fast_frame_ms: f64,
    pub shrink_fraction: f64,
    pub grow_fraction: f64,
    pub min_capacity: usize,
    pub max_capacity: usize,
    pub min_idle_budget: usize,
    pub max_idle_budget: usize,
    /// Chunks within this radius are always kept affordable.
    pub near_radius: u32,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self::for_device(DeviceClass::Desktop)
    }
}

impl GovernorSettings {
    pub fn for_device(device: DeviceClass) -> Self {
        let desktop = Self {
            enabled: true,
            window: FRAME_WINDOW,
            evaluation_interval: GOVERNOR_INTERVAL_SECS,
            slow_frame_ms: SLOW_FRAME_MS,
            fast_frame_ms: FAST_FRAME_MS,
            shrink_fraction: 0.2,
            grow_fraction: 0.1,
            min_capacity: 32,
            max_capacity: 512,
            min_idle_budget: 8,
            max_idle_budget: 256,
            near_radius: 2,
        };
        match device {
            DeviceClass::Desktop => desktop,
            DeviceClass::Mobile => Self {
                min_capacity: 24,
                max_capacity: 160,
                min_idle_budget: 4,
                max_idle_budget: 48,
                ..desktop
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::invalid("governor.window", "must hold at least one frame"));
        }
        if !(self.evaluation_interval > 0.0 && self.evaluation_interval.is_finite()) {
            return Err(ConfigError::invalid(
                "governor.evaluation_interval",
                "must be a positive number of seconds",
            ));
        }
        if !(self.fast_frame_ms < self.slow_frame_ms) {
            return Err(ConfigError::invalid(
                "governor.fast_frame_ms",
                format!(
                    "{} must be below slow_frame_ms {}",
                    self.fast_frame_ms, self.slow_frame_ms
                ),
            ));
        }
        for (name, value) in [
            ("governor.shrink_fraction", self.shrink_fraction),
            ("governor.grow_fraction", self.grow_fraction),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::invalid(name, "must lie in (0, 1)"));
            }
        }
        if self.max_capacity < capacity_floor(self) {
            return Err(ConfigError::invalid(
                "governor.max_capacity",
                "below the near-radius chunk count or min_capacity",
            ));
        }
        if self.max_idle_budget < self.min_idle_budget {
            return Err(ConfigError::invalid(
                "governor.max_idle_budget",
                "below min_idle_budget",
            ));
        }
        Ok(())
    }
}

fn capacity_floor(settings: &GovernorSettings) -> usize {
    let near = ChunkCoord::default().window(settings.near_radius as i32).count();
    settings.min_capacity.max(near)
}

/// Budgets the governor steers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Budgets {
    pub capacity: usize,
    pub idle_budget: usize,
}

/// A change to apply to the chunk store and geometry pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BudgetAdjustment {
    pub before: Budgets,
    pub after: Budgets,
    pub average_frame_ms: f64,
}

/// Synthesis timing, rolled over at every evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SynthesisThroughput {
    pub chunks_this_interval: usize,
    pub chunks_last_interval: usize,
    pub last_ms: f64,
    pub average_ms: f64,
    pub total_chunks: u64,
}

pub struct PerformanceGovernor {
    settings: GovernorSettings,
    frames: VecDeque<f64>,
    accumulated: f64,
    floor: usize,
    throughput: SynthesisThroughput,
}

impl PerformanceGovernor {
    pub fn new(settings: GovernorSettings) -> Self {
        let floor = capacity_floor(&settings);
        PerformanceGovernor {
            frames: VecDeque::with_capacity(settings.window),
            settings,
            accumulated: 0.0,
            floor,
            throughput: SynthesisThroughput::default(),
        }
    }

    pub fn settings(&self) -> &GovernorSettings {
        &self.settings
    }

    /// Lowest capacity the governor will ever set.
    pub fn capacity_floor(&self) -> usize {
        self.floor
    }

    pub fn average_frame_ms(&self) -> f64 {
        if self.frames.is_empty() {
            0.0
        } else {
            self.frames.iter().sum::<f64>() / self.frames.len() as f64
        }
    }

    pub fn throughput(&self) -> SynthesisThroughput {
        self.throughput
    }

    /// Count one completed synthesis job.
    pub fn record_throughput(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        let t = &mut self.throughput;
        t.chunks_this_interval += 1;
        t.total_chunks += 1;
        t.last_ms = ms;
        t.average_ms = if t.total_chunks == 1 {
            ms
        } else {
            t.average_ms * 0.9 + ms * 0.1
        };
    }

    /// Push one frame time (seconds). Returns an adjustment when an
    /// evaluation changes either budget.
    pub fn record_frame(&mut self, dt: f64, current: Budgets) -> Option<BudgetAdjustment> {
        if !dt.is_finite() || dt < 0.0 {
            return None;
        }

        self.frames.push_back(dt * 1000.0);
        while self.frames.len() > self.settings.window {
            self.frames.pop_front();
        }

        self.accumulated += dt;
        if self.accumulated < self.settings.evaluation_interval {
            return None;
        }
        self.accumulated = 0.0;
        self.throughput.chunks_last_interval = self.throughput.chunks_this_interval;
        self.throughput.chunks_this_interval = 0;

        if !self.settings.enabled {
            return None;
        }

        let s = &self.settings;
        let average = self.average_frame_ms();
        let factor = if average > s.slow_frame_ms {
            1.0 - s.shrink_fraction
        } else if average < s.fast_frame_ms {
            1.0 + s.grow_fraction
        } else {
            return None;
        };

        let scale = |value: usize| {
            let scaled = value as f64 * factor;
            if factor > 1.0 { scaled.ceil() } else { scaled.floor() }
        };
        let after = Budgets {
            // The floor wins if unvalidated settings put it above the ceiling
            capacity: (scale(current.capacity) as usize)
                .min(s.max_capacity)
                .max(self.floor),
            idle_budget: (scale(current.idle_budget) as usize)
                .min(s.max_idle_budget)
                .max(s.min_idle_budget),
        };

        if after == current {
            return None;
        }

        tracing::info!(
            average_frame_ms = average,
            capacity = after.capacity,
            idle_budget = after.idle_budget,
            "adjusting streaming budgets"
        );
        Some(BudgetAdjustment {
            before: current,
            after,
            average_frame_ms: average,
        })
    }
}
