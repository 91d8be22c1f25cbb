//! Stochastic event catalog.
//!
//! Every event is an independent Bernoulli trial per tick; any subset may
//! co-occur. Probabilities never exceed [`EVENT_PROBABILITY_CEILING`] and are
//! restored to their base values at the end of each tick.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::EVENT_PROBABILITY_CEILING;
use crate::numbers::{clamp_impact, clamp_probability, usize_to_f64};

pub mod hazard;
pub mod impact;

pub use hazard::{HazardModulator, HazardReport, HazardStep};
pub use impact::{EventScorer, ImpactSource, ResolvedEvents, resolve_impacts};

const DEFAULT_RANDOM_EVENTS_DATA: &str = include_str!("../../assets/random_events.json");

/// Errors raised while loading event definitions.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("event catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("event `{id}` probability {value} is outside [0, {ceiling}]")]
    ProbabilityOutOfRange { id: String, value: f64, ceiling: f64 },
    #[error("event `{id}` has an empty impact range ({min} > {max})")]
    EmptyImpactRange { id: String, min: i32, max: i32 },
    #[error("hazard steps must be ordered by descending health with non-decreasing multipliers")]
    NonMonotonicHazard,
}

/// Impact on one axis: either a fixed value or a range re-rolled on every
/// catalog initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImpactSpec {
    Fixed(i32),
    Range { min: i32, max: i32 },
}

impl ImpactSpec {
    /// Bounds clamped to `[-3, 3]`.
    #[must_use]
    pub const fn bounds(self) -> (i32, i32) {
        match self {
            Self::Fixed(value) => (clamp_impact(value), clamp_impact(value)),
            Self::Range { min, max } => (clamp_impact(min), clamp_impact(max)),
        }
    }

    fn roll<R: Rng + ?Sized>(self, rng: &mut R) -> i32 {
        let (min, max) = self.bounds();
        if min >= max {
            min
        } else {
            rng.gen_range(min..=max)
        }
    }
}

/// Static definition of an event as stored in catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub probability: f64,
    pub country: ImpactSpec,
    pub shoreline: ImpactSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    events: Vec<EventDefinition>,
}

/// Parsed built-in event definitions.
#[must_use]
pub fn builtin_definitions() -> &'static [EventDefinition] {
    static DEFINITIONS: OnceLock<Vec<EventDefinition>> = OnceLock::new();
    DEFINITIONS.get_or_init(|| {
        serde_json::from_str::<CatalogFile>(DEFAULT_RANDOM_EVENTS_DATA)
            .unwrap_or_default()
            .events
    })
}

/// Parse event definitions from catalog JSON (`{"events": [...]}`).
///
/// # Errors
///
/// Returns an error if the JSON is malformed or a definition is out of range.
pub fn parse_definitions(json: &str) -> Result<Vec<EventDefinition>, CatalogError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    for def in &file.events {
        validate_definition(def)?;
    }
    Ok(file.events)
}

fn validate_definition(def: &EventDefinition) -> Result<(), CatalogError> {
    if !def.probability.is_finite() || !(0.0..=EVENT_PROBABILITY_CEILING).contains(&def.probability)
    {
        return Err(CatalogError::ProbabilityOutOfRange {
            id: def.id.clone(),
            value: def.probability,
            ceiling: EVENT_PROBABILITY_CEILING,
        });
    }
    for spec in [def.country, def.shoreline] {
        if let ImpactSpec::Range { min, max } = spec
            && min > max
        {
            return Err(CatalogError::EmptyImpactRange {
                id: def.id.clone(),
                min,
                max,
            });
        }
    }
    Ok(())
}

/// A concrete event for the current catalog initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomEvent {
    pub id: String,
    pub name: String,
    pub description: String,
    base_probability: f64,
    probability: f64,
    country_impact: i32,
    shoreline_impact: i32,
}

impl RandomEvent {
    fn from_definition<R: Rng + ?Sized>(def: &EventDefinition, rng: &mut R) -> Self {
        let base = clamp_probability(def.probability, EVENT_PROBABILITY_CEILING);
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            base_probability: base,
            probability: base,
            country_impact: def.country.roll(rng),
            shoreline_impact: def.shoreline.roll(rng),
        }
    }

    /// Unmodulated probability.
    #[must_use]
    pub const fn base_probability(&self) -> f64 {
        self.base_probability
    }

    /// Probability used by the next trial, after any hazard modulation.
    #[must_use]
    pub const fn probability(&self) -> f64 {
        self.probability
    }

    /// Fixed country impact, already within `[-3, 3]`.
    #[must_use]
    pub const fn country_impact(&self) -> i32 {
        self.country_impact
    }

    /// Fixed shoreline impact, already within `[-3, 3]`.
    #[must_use]
    pub const fn shoreline_impact(&self) -> i32 {
        self.shoreline_impact
    }

    /// Events that hurt at least one axis are subject to hazard modulation.
    #[must_use]
    pub const fn is_negative_leaning(&self) -> bool {
        self.country_impact < 0 || self.shoreline_impact < 0
    }

    /// Events that help both axes.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.country_impact > 0 && self.shoreline_impact > 0
    }
}

/// Result of one Bernoulli trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredEvent {
    pub event: RandomEvent,
    pub occurred: bool,
}

/// Recorded view of an event after impact resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Probability used for the trial.
    pub probability: f64,
    pub occurred: bool,
    pub country_impact: i32,
    pub shoreline_impact: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ImpactSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Aggregate shape of a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStatistics {
    pub total_events: usize,
    pub disaster_events: usize,
    pub positive_events: usize,
    pub neutral_events: usize,
    pub max_probability: f64,
    pub avg_probability: f64,
}

/// Event set for a single game.
#[derive(Debug, Clone, PartialEq)]
pub struct EventCatalog {
    definitions: Vec<EventDefinition>,
    events: Vec<RandomEvent>,
}

impl EventCatalog {
    /// Build from the bundled definitions.
    #[must_use]
    pub fn builtin<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_definitions(builtin_definitions().to_vec(), rng)
    }

    /// Build from already validated definitions, rolling ranged impacts.
    #[must_use]
    pub fn from_definitions<R: Rng + ?Sized>(definitions: Vec<EventDefinition>, rng: &mut R) -> Self {
        let events = definitions
            .iter()
            .map(|def| RandomEvent::from_definition(def, rng))
            .collect();
        Self {
            definitions,
            events,
        }
    }

    /// Parse and build from catalog JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a definition is out of range.
    pub fn from_json<R: Rng + ?Sized>(json: &str, rng: &mut R) -> Result<Self, CatalogError> {
        Ok(Self::from_definitions(parse_definitions(json)?, rng))
    }

    #[must_use]
    pub fn events(&self) -> &[RandomEvent] {
        &self.events
    }

    #[must_use]
    pub fn definitions(&self) -> &[EventDefinition] {
        &self.definitions
    }

    #[must_use]
    pub const fn ceiling(&self) -> f64 {
        EVENT_PROBABILITY_CEILING
    }

    /// Scale every negative-leaning event's base probability, clamped to the
    /// ceiling. Returns the number of events touched.
    pub fn apply_multiplier(&mut self, multiplier: f64) -> usize {
        let mut touched = 0;
        for event in &mut self.events {
            if event.is_negative_leaning() {
                event.probability =
                    clamp_probability(event.base_probability * multiplier, EVENT_PROBABILITY_CEILING);
                touched += 1;
            }
        }
        touched
    }

    /// Draw one independent trial per event, keeping non-occurrences.
    pub fn trigger<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<TriggeredEvent> {
        self.events
            .iter()
            .map(|event| {
                let roll = rng.r#gen::<f64>();
                TriggeredEvent {
                    event: event.clone(),
                    occurred: roll < event.probability,
                }
            })
            .collect()
    }

    /// Restore every probability to its unmodulated base value.
    pub fn reset(&mut self) {
        for event in &mut self.events {
            event.probability = event.base_probability;
        }
    }

    /// Rebuild every event from its definition: base probabilities and freshly
    /// rolled ranged impacts.
    pub fn reinitialize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.events = self
            .definitions
            .iter()
            .map(|def| RandomEvent::from_definition(def, rng))
            .collect();
    }

    #[must_use]
    pub fn statistics(&self) -> EventStatistics {
        let total_events = self.events.len();
        let disaster_events = self.events.iter().filter(|e| e.is_negative_leaning()).count();
        let positive_events = self.events.iter().filter(|e| e.is_positive()).count();
        let max_probability = self
            .events
            .iter()
            .map(RandomEvent::probability)
            .fold(0.0_f64, f64::max);
        let avg_probability = if total_events == 0 {
            0.0
        } else {
            self.events.iter().map(RandomEvent::probability).sum::<f64>()
                / usize_to_f64(total_events)
        };
        EventStatistics {
            total_events,
            disaster_events,
            positive_events,
            neutral_events: total_events - disaster_events - positive_events,
            max_probability,
            avg_probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn definition(id: &str, probability: f64, country: i32, shoreline: i32) -> EventDefinition {
        EventDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            probability,
            country: ImpactSpec::Fixed(country),
            shoreline: ImpactSpec::Fixed(shoreline),
        }
    }

    #[test]
    fn builtin_catalog_covers_every_family() {
        let mut rng = SmallRng::seed_from_u64(1);
        let catalog = EventCatalog::builtin(&mut rng);
        assert_eq!(catalog.events().len(), 17);
        for event in catalog.events() {
            assert!(event.base_probability() <= EVENT_PROBABILITY_CEILING);
            assert!((-3..=3).contains(&event.country_impact()));
            assert!((-3..=3).contains(&event.shoreline_impact()));
        }
        assert!(catalog.events().iter().any(|e| e.id == "tsunami"));
        assert!(catalog.events().iter().any(|e| e.id == "ecotourism_boom"));
        assert!(catalog.events().iter().any(|e| e.id == "current_shift"));
    }

    #[test]
    fn builtin_definitions_pass_validation() {
        let json = include_str!("../../assets/random_events.json");
        let parsed = parse_definitions(json).expect("builtin catalog is valid");
        assert_eq!(parsed.len(), builtin_definitions().len());
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let json = r#"{ "events": [
            { "id": "meteor", "name": "Meteor", "probability": 0.5, "country": -3, "shoreline": -3 }
        ] }"#;
        let err = parse_definitions(json).expect_err("probability above ceiling");
        assert!(matches!(err, CatalogError::ProbabilityOutOfRange { .. }));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let json = r#"{ "events": [
            { "id": "odd", "name": "Odd", "probability": 0.05,
              "country": 0, "shoreline": { "min": 2, "max": -2 } }
        ] }"#;
        assert!(matches!(
            parse_definitions(json),
            Err(CatalogError::EmptyImpactRange { .. })
        ));
    }

    #[test]
    fn fixed_impacts_are_clamped_into_bounds() {
        let mut rng = SmallRng::seed_from_u64(3);
        let catalog =
            EventCatalog::from_definitions(vec![definition("quake", 0.01, -9, 5)], &mut rng);
        let event = &catalog.events()[0];
        assert_eq!(event.country_impact(), -3);
        assert_eq!(event.shoreline_impact(), 3);
    }

    #[test]
    fn trigger_keeps_non_occurrences_and_allows_co_occurrence() {
        let defs = vec![
            definition("always_a", 0.1, -1, -1),
            definition("always_b", 0.1, 1, 1),
            definition("never", 0.0, 1, 1),
        ];
        let mut rng = SmallRng::seed_from_u64(11);
        let catalog = EventCatalog::from_definitions(defs, &mut rng);
        let mut both = false;
        for _ in 0..2_000 {
            let triggered = catalog.trigger(&mut rng);
            assert_eq!(triggered.len(), 3);
            assert!(!triggered[2].occurred);
            if triggered[0].occurred && triggered[1].occurred {
                both = true;
            }
        }
        assert!(both, "independent events should co-occur eventually");
    }

    #[test]
    fn trigger_is_seed_stable() {
        let mut setup = SmallRng::seed_from_u64(5);
        let catalog = EventCatalog::builtin(&mut setup);
        let mut rng_one = SmallRng::seed_from_u64(99);
        let mut rng_two = SmallRng::seed_from_u64(99);
        for _ in 0..50 {
            assert_eq!(catalog.trigger(&mut rng_one), catalog.trigger(&mut rng_two));
        }
    }

    #[test]
    fn multiplier_only_touches_negative_leaning_events() {
        let defs = vec![
            definition("storm", 0.04, -1, -1),
            definition("aid", 0.08, 3, 1),
            definition("drift", 0.05, 0, 0),
        ];
        let mut rng = SmallRng::seed_from_u64(2);
        let mut catalog = EventCatalog::from_definitions(defs, &mut rng);
        let touched = catalog.apply_multiplier(0.5);
        assert_eq!(touched, 1);
        assert!((catalog.events()[0].probability() - 0.02).abs() < 1e-12);
        assert!((catalog.events()[1].probability() - 0.08).abs() < 1e-12);
        assert!((catalog.events()[2].probability() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn multiplier_never_exceeds_ceiling() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut catalog =
            EventCatalog::from_definitions(vec![definition("storm", 0.09, -1, -1)], &mut rng);
        catalog.apply_multiplier(1.5);
        assert!((catalog.events()[0].probability() - EVENT_PROBABILITY_CEILING).abs() < 1e-12);
    }

    // Probabilities are fully restored every tick: no memory of a previous
    // tick's boosted hazard survives a reset.
    #[test]
    fn reset_restores_base_probabilities_bit_for_bit() {
        let mut rng = SmallRng::seed_from_u64(21);
        let fresh = EventCatalog::builtin(&mut SmallRng::seed_from_u64(21));
        let mut catalog = EventCatalog::builtin(&mut rng);
        catalog.apply_multiplier(1.5);
        let _ = catalog.trigger(&mut rng);
        catalog.reset();
        for (after, before) in catalog.events().iter().zip(fresh.events()) {
            assert_eq!(after.probability().to_bits(), before.base_probability().to_bits());
            assert_eq!(after.base_probability().to_bits(), before.base_probability().to_bits());
        }
    }

    #[test]
    fn reinitialize_rerolls_ranges_within_bounds() {
        let defs = vec![EventDefinition {
            id: String::from("drift"),
            name: String::from("Drift"),
            description: String::new(),
            probability: 0.05,
            country: ImpactSpec::Range { min: -1, max: 1 },
            shoreline: ImpactSpec::Range { min: -2, max: 2 },
        }];
        let mut rng = SmallRng::seed_from_u64(4);
        let mut catalog = EventCatalog::from_definitions(defs, &mut rng);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            catalog.apply_multiplier(1.2);
            catalog.reinitialize(&mut rng);
            let event = &catalog.events()[0];
            assert!((-1..=1).contains(&event.country_impact()));
            assert!((-2..=2).contains(&event.shoreline_impact()));
            assert_eq!(event.probability().to_bits(), 0.05_f64.to_bits());
            seen.insert(event.shoreline_impact());
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn statistics_count_families() {
        let defs = vec![
            definition("storm", 0.04, -1, -1),
            definition("aid", 0.08, 3, 1),
            definition("drift", 0.02, 0, 1),
        ];
        let mut rng = SmallRng::seed_from_u64(6);
        let stats = EventCatalog::from_definitions(defs, &mut rng).statistics();
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.disaster_events, 1);
        assert_eq!(stats.positive_events, 1);
        assert_eq!(stats.neutral_events, 1);
        assert!((stats.max_probability - 0.08).abs() < 1e-12);
        assert!((stats.avg_probability - 0.14 / 3.0).abs() < 1e-12);
    }
}
