//! Health-dependent scaling of negative-leaning event probabilities.
use serde::{Deserialize, Serialize};

use super::{CatalogError, EventCatalog};

/// One rung of the step function: health at or above `min_health` uses `multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardStep {
    pub min_health: i32,
    pub multiplier: f64,
}

const DEFAULT_STEPS: [HazardStep; 4] = [
    HazardStep {
        min_health: 90,
        multiplier: 0.5,
    },
    HazardStep {
        min_health: 75,
        multiplier: 0.8,
    },
    HazardStep {
        min_health: 60,
        multiplier: 1.0,
    },
    HazardStep {
        min_health: 45,
        multiplier: 1.2,
    },
];
const DEFAULT_FLOOR_MULTIPLIER: f64 = 1.5;

/// What a modulation pass did, for observers and records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardReport {
    pub health: i32,
    pub multiplier: f64,
    pub modulated_events: usize,
}

/// Monotonic step function from shoreline health to a hazard multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardModulator {
    steps: Vec<HazardStep>,
    floor_multiplier: f64,
}

impl Default for HazardModulator {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS.to_vec(),
            floor_multiplier: DEFAULT_FLOOR_MULTIPLIER,
        }
    }
}

impl HazardModulator {
    /// Build a custom step table.
    ///
    /// Steps must be ordered by strictly descending `min_health` with
    /// non-decreasing multipliers, and `floor_multiplier` must not be lower
    /// than the last step, so healthier shorelines never see more hazard.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NonMonotonicHazard`] when the table is not monotonic
    /// or a multiplier is negative or non-finite.
    pub fn with_steps(steps: Vec<HazardStep>, floor_multiplier: f64) -> Result<Self, CatalogError> {
        let valid_multiplier = |m: f64| m.is_finite() && m >= 0.0;
        if !valid_multiplier(floor_multiplier) || steps.iter().any(|s| !valid_multiplier(s.multiplier))
        {
            return Err(CatalogError::NonMonotonicHazard);
        }
        let ordered = steps.windows(2).all(|pair| {
            pair[0].min_health > pair[1].min_health && pair[0].multiplier <= pair[1].multiplier
        });
        let floor_ok = steps.last().is_none_or(|last| last.multiplier <= floor_multiplier);
        if !ordered || !floor_ok {
            return Err(CatalogError::NonMonotonicHazard);
        }
        Ok(Self {
            steps,
            floor_multiplier,
        })
    }

    #[must_use]
    pub fn steps(&self) -> &[HazardStep] {
        &self.steps
    }

    /// Multiplier for the given shoreline health.
    #[must_use]
    pub fn multiplier(&self, health: i32) -> f64 {
        self.steps
            .iter()
            .find(|step| health >= step.min_health)
            .map_or(self.floor_multiplier, |step| step.multiplier)
    }

    /// Scale the catalog's negative-leaning events for this tick.
    pub fn modulate(&self, catalog: &mut EventCatalog, health: i32) -> HazardReport {
        let multiplier = self.multiplier(health);
        let modulated_events = catalog.apply_multiplier(multiplier);
        HazardReport {
            health,
            multiplier,
            modulated_events,
        }
    }
}
