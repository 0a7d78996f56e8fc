//! Adsorption filter wear carried across runs.
//!
//! Every completed run adds one use. Once the use count reaches the
//! configured threshold the adsorption stage only reaches the degraded
//! target until the operator regenerates the filter.

use aquaflow_types::FilterWearState;

use crate::config::FilterConfig;

/// Cross-run counter deciding the adsorption target.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterWearModel {
    uses_since_regeneration: u32,
    degrade_after_uses: u32,
    fresh_target_ppm: f64,
    degraded_target_ppm: f64,
}

impl FilterWearModel {
    /// Create a freshly regenerated filter.
    pub const fn new(config: &FilterConfig) -> Self {
        Self {
            uses_since_regeneration: 0,
            degrade_after_uses: config.degrade_after_uses,
            fresh_target_ppm: config.fresh_target_ppm,
            degraded_target_ppm: config.degraded_target_ppm,
        }
    }

    /// Completed runs since the last regeneration.
    pub const fn uses(&self) -> u32 {
        self.uses_since_regeneration
    }

    /// Whether the filter has reached its wear threshold.
    pub const fn is_degraded(&self) -> bool {
        self.uses_since_regeneration >= self.degrade_after_uses
    }

    /// Concentration the adsorption stage reaches with this filter.
    pub const fn target_ppm(&self) -> f64 {
        if self.is_degraded() {
            self.degraded_target_ppm
        } else {
            self.fresh_target_ppm
        }
    }

    /// Count one completed run.
    pub const fn record_use(&mut self) {
        self.uses_since_regeneration = self.uses_since_regeneration.saturating_add(1);
    }

    /// Reset wear to zero.
    pub const fn regenerate(&mut self) {
        self.uses_since_regeneration = 0;
    }

    /// Serializable view for the display layer.
    pub const fn state(&self) -> FilterWearState {
        FilterWearState {
            uses_since_regeneration: self.uses_since_regeneration,
            degraded: self.is_degraded(),
        }
    }
}
