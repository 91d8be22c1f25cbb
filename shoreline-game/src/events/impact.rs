//! Static and arbitrated resolution of triggered event impacts.
use serde::{Deserialize, Serialize};

use super::{EventOutcome, RandomEvent, TriggeredEvent};
use crate::clock::Cancelled;
use crate::config::ImpactStrategy;
use crate::normalize::EventAssessment;
use crate::numbers::clamp_impact;
use crate::observer::GameObserver;
use crate::oracle::InvokeError;
use crate::state::{AxisDelta, Scores};

/// Where an occurred event's impact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactSource {
    Static,
    Arbitrated,
    /// Arbitration failed for this event and the fixed values were used.
    StaticFallback,
}

/// External scorer for a single occurred event.
pub trait EventScorer {
    /// # Errors
    ///
    /// Any error makes the caller fall back to the event's fixed impacts.
    fn assess(&self, event: &RandomEvent, scores: Scores) -> Result<EventAssessment, InvokeError>;
}

/// Outcomes for every trial plus the summed delta of those that occurred.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedEvents {
    pub outcomes: Vec<EventOutcome>,
    pub total: AxisDelta,
}

impl ResolvedEvents {
    pub fn occurred(&self) -> impl Iterator<Item = &EventOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.occurred)
    }
}

/// Resolve the numeric effect of each occurred event.
///
/// With [`ImpactStrategy::Arbitrated`] each occurred event is scored
/// separately; a failed call falls back to the static values for that event
/// only. Every impact is clamped to `[-3, 3]`.
///
/// # Errors
///
/// Returns [`Cancelled`] when a scoring call was interrupted by cancellation.
pub fn resolve_impacts(
    triggered: Vec<TriggeredEvent>,
    strategy: ImpactStrategy,
    scorer: &dyn EventScorer,
    scores: Scores,
    observer: &dyn GameObserver,
) -> Result<ResolvedEvents, Cancelled> {
    let mut resolved = ResolvedEvents::default();
    for TriggeredEvent { event, occurred } in triggered {
        let mut outcome = static_outcome(&event, occurred);
        if occurred {
            if strategy == ImpactStrategy::Arbitrated {
                match scorer.assess(&event, scores) {
                    Ok(assessment) => {
                        outcome.country_impact = clamp_impact(assessment.country_impact);
                        outcome.shoreline_impact = clamp_impact(assessment.shoreline_impact);
                        outcome.source = Some(ImpactSource::Arbitrated);
                        outcome.reasoning =
                            Some(assessment.reasoning).filter(|text| !text.is_empty());
                    }
                    Err(InvokeError::Cancelled) => return Err(Cancelled),
                    Err(err) => {
                        observer.on_arbitration_fallback(&event.id, &err);
                        outcome.source = Some(ImpactSource::StaticFallback);
                    }
                }
            }
            resolved.total = resolved.total
                + AxisDelta::new(outcome.country_impact, outcome.shoreline_impact);
            observer.on_event_occurred(&outcome);
        }
        resolved.outcomes.push(outcome);
    }
    Ok(resolved)
}

fn static_outcome(event: &RandomEvent, occurred: bool) -> EventOutcome {
    EventOutcome {
        id: event.id.clone(),
        name: event.name.clone(),
        description: event.description.clone(),
        probability: event.probability(),
        occurred,
        country_impact: clamp_impact(event.country_impact()),
        shoreline_impact: clamp_impact(event.shoreline_impact()),
        source: occurred.then_some(ImpactSource::Static),
        reasoning: None,
    }
}
