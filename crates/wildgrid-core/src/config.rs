//! Configuration types for the simulation.

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Width of the grid
    pub width: i32,
    /// Height of the grid
    pub height: i32,
    /// Number of hunters
    pub hunters: u32,
    /// Seed for the master RNG; per-agent RNGs are derived from it
    pub seed: u64,
    /// Minimum agent think-time between moves, milliseconds
    pub think_min_ms: u64,
    /// Maximum agent think-time between moves, milliseconds
    pub think_max_ms: u64,
    /// Terrain roll below this is Wintering
    pub wintering_cut: f64,
    /// Terrain roll in [wintering_cut, feeding_cut) is Feeding, above is Nesting
    pub feeding_cut: f64,
    /// Probability an animal dies on entering a wintering site
    pub winter_death_prob: f64,
    /// Roll at or above this triggers the extra wander on a feeding site
    pub feeding_wander_threshold: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 5,
            height: 5,
            hunters: 0,
            seed: 0,
            think_min_ms: 1000,
            think_max_ms: 3000,
            wintering_cut: 0.33,
            feeding_cut: 0.66,
            winter_death_prob: 0.5,
            feeding_wander_threshold: 0.8,
        }
    }
}

impl SimConfig {
    /// Check that the configuration can actually run
    pub fn validate(&self) -> Result<()> {
        if self.width < 1 || self.height < 1 {
            return Err(Error::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.think_min_ms > self.think_max_ms {
            return Err(Error::InvalidConfig(format!(
                "think_min_ms {} exceeds think_max_ms {}",
                self.think_min_ms, self.think_max_ms
            )));
        }
        for (name, value) in [
            ("wintering_cut", self.wintering_cut),
            ("feeding_cut", self.feeding_cut),
            ("winter_death_prob", self.winter_death_prob),
            ("feeding_wander_threshold", self.feeding_wander_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.wintering_cut > self.feeding_cut {
            return Err(Error::InvalidConfig(format!(
                "wintering_cut {} exceeds feeding_cut {}",
                self.wintering_cut, self.feeding_cut
            )));
        }
        Ok(())
    }

    /// Draw a think-time from the configured range
    pub fn think_time(&self, rng: &mut impl Rng) -> Duration {
        Duration::from_millis(rng.gen_range(self.think_min_ms..=self.think_max_ms))
    }
}
