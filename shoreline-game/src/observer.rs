//! Injected observation hooks.
//!
//! Components report through a [`GameObserver`] rather than a process-wide
//! logger. [`LogObserver`] forwards to the `log` facade; [`NullObserver`]
//! discards everything.
use std::time::Duration;

use crate::events::{EventOutcome, HazardReport};
use crate::normalize::ParseIssue;
use crate::oracle::{FailureKind, InvokeError, OracleRole};
use crate::state::{GameSummary, Scores, YearlyRecord};

/// Progress and diagnostics emitted while a game runs. Every hook is optional.
pub trait GameObserver {
    fn on_game_started(&self, _game_index: usize, _seed: u64) {}

    fn on_tick_started(&self, _year: u32, _scores: Scores) {}

    /// A single oracle attempt failed; `wait` is `None` after the final attempt.
    fn on_oracle_retry(
        &self,
        _role: OracleRole,
        _attempt: u32,
        _max_attempts: u32,
        _failure: &FailureKind,
        _wait: Option<Duration>,
    ) {
    }

    fn on_parse_issue(&self, _role: OracleRole, _issue: &ParseIssue) {}

    fn on_hazard_modulated(&self, _report: &HazardReport) {}

    fn on_event_occurred(&self, _event: &EventOutcome) {}

    /// Arbitrated scoring failed for one event; static impacts were used.
    fn on_arbitration_fallback(&self, _event_id: &str, _error: &InvokeError) {}

    fn on_tick_recorded(&self, _record: &YearlyRecord) {}

    fn on_game_finished(&self, _summary: &GameSummary) {}
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl GameObserver for NullObserver {}

/// Forwards notifications to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl GameObserver for LogObserver {
    fn on_game_started(&self, game_index: usize, seed: u64) {
        log::info!("game {} started (seed {seed})", game_index + 1);
    }

    fn on_tick_started(&self, year: u32, scores: Scores) {
        log::info!(
            "year {year}: country {} / shoreline {}",
            scores.country,
            scores.shoreline
        );
    }

    fn on_oracle_retry(
        &self,
        role: OracleRole,
        attempt: u32,
        max_attempts: u32,
        failure: &FailureKind,
        wait: Option<Duration>,
    ) {
        match wait {
            Some(wait) => log::warn!(
                "{role} attempt {attempt}/{max_attempts} failed: {failure}; retrying in {:.1}s",
                wait.as_secs_f64()
            ),
            None => log::warn!("{role} attempt {attempt}/{max_attempts} failed: {failure}"),
        }
    }

    fn on_parse_issue(&self, role: OracleRole, issue: &ParseIssue) {
        log::warn!("{role} response: {issue}");
    }

    fn on_hazard_modulated(&self, report: &HazardReport) {
        log::debug!(
            "shoreline health {} -> hazard x{:.1} on {} events",
            report.health,
            report.multiplier,
            report.modulated_events
        );
    }

    fn on_event_occurred(&self, event: &EventOutcome) {
        log::info!(
            "event: {} (country {:+}, shoreline {:+})",
            event.name,
            event.country_impact,
            event.shoreline_impact
        );
    }

    fn on_arbitration_fallback(&self, event_id: &str, error: &InvokeError) {
        log::warn!("event `{event_id}` arbitration failed ({error}); using static impact");
    }

    fn on_tick_recorded(&self, record: &YearlyRecord) {
        let total = record.breakdown.total();
        log::debug!(
            "year {} recorded: delta country {:+} shoreline {:+}",
            record.year,
            total.country,
            total.shoreline
        );
    }

    fn on_game_finished(&self, summary: &GameSummary) {
        match &summary.aborted {
            Some(why) => log::warn!("game aborted after {} years: {why}", summary.total_years),
            None => log::info!("{} after {} years", summary.reason, summary.total_years),
        }
    }
}
