//! Turn and score state machine for a single game.
//!
//! A game starts `Active` at year 0 and ends in exactly one absorbing
//! `Terminated` state. Scores are clamped to `[0, 100]` after every update.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::config::GameConfig;
use crate::constants::{DEFAULT_CHALLENGES, DEFAULT_OPPORTUNITIES};
use crate::events::EventOutcome;
use crate::normalize::{ArbitrationScores, Decision, EnvironmentFeedback};
use crate::numbers::clamp_score;

/// Pair of score axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scores {
    pub country: i32,
    pub shoreline: i32,
}

impl Scores {
    #[must_use]
    pub const fn new(country: i32, shoreline: i32) -> Self {
        Self { country, shoreline }
    }
}

/// Signed change applied to both score axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AxisDelta {
    pub country: i32,
    pub shoreline: i32,
}

impl AxisDelta {
    pub const ZERO: Self = Self::new(0, 0);

    #[must_use]
    pub const fn new(country: i32, shoreline: i32) -> Self {
        Self { country, shoreline }
    }

    /// The same delta on both axes.
    #[must_use]
    pub const fn uniform(value: i32) -> Self {
        Self::new(value, value)
    }
}

impl Add for AxisDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.country.saturating_add(rhs.country),
            self.shoreline.saturating_add(rhs.shoreline),
        )
    }
}

impl std::iter::Sum for AxisDelta {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Why a game stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationReason {
    /// Country development reached the victory threshold.
    Victory,
    /// Shoreline health fell below the failure threshold.
    Failure,
    /// The year limit was reached without victory or failure.
    Timeout,
}

impl TerminationReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Failure => "failure",
            Self::Timeout => "timeout",
        }
    }

    #[must_use]
    pub const fn is_victory(self) -> bool {
        matches!(self, Self::Victory)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds that decide termination, copied out of [`GameConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub victory: i32,
    pub failure: i32,
    pub max_years: u32,
}

impl Thresholds {
    /// Human readable explanation for a termination reason.
    #[must_use]
    pub fn describe(&self, reason: Option<TerminationReason>) -> String {
        match reason {
            Some(TerminationReason::Victory) => format!(
                "Country development reached {} points: victory",
                self.victory
            ),
            Some(TerminationReason::Failure) => format!(
                "Shoreline status fell below {} points: failure",
                self.failure
            ),
            Some(TerminationReason::Timeout) => {
                format!("Reached the {}-year limit: game over", self.max_years)
            }
            None => String::from("Game in progress"),
        }
    }
}

/// Component breakdown of one tick's score change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScoreBreakdown {
    pub arbitration: AxisDelta,
    pub random: AxisDelta,
    pub annual_bonus: i32,
}

impl ScoreBreakdown {
    /// Unclamped total applied to each axis.
    #[must_use]
    pub fn total(&self) -> AxisDelta {
        self.arbitration + self.random + AxisDelta::uniform(self.annual_bonus)
    }
}

/// Immutable snapshot of a completed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyRecord {
    pub year: u32,
    pub country_score: i32,
    pub shoreline_score: i32,
    pub decision: Decision,
    pub feedback: EnvironmentFeedback,
    pub arbitration: ArbitrationScores,
    pub events: Vec<EventOutcome>,
    pub breakdown: ScoreBreakdown,
}

impl YearlyRecord {
    /// Events that actually fired during the tick.
    pub fn occurred_events(&self) -> impl Iterator<Item = &EventOutcome> {
        self.events.iter().filter(|event| event.occurred)
    }
}

/// Summary exposed to exporters once a game stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub initial_scores: Scores,
    pub final_scores: Scores,
    pub total_years: u32,
    pub termination: Option<TerminationReason>,
    pub victory: bool,
    pub reason: String,
    /// Set when the game was aborted before reaching a termination reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub yearly_records: Vec<YearlyRecord>,
}

impl GameSummary {
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Scores and year at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickCheckpoint {
    scores: Scores,
    year: u32,
}

/// Mutable state for one game, owned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    country_score: i32,
    shoreline_score: i32,
    year: u32,
    termination: Option<TerminationReason>,
    initial: Scores,
    thresholds: Thresholds,
    environment: EnvironmentFeedback,
    records: Vec<YearlyRecord>,
}

impl GameState {
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        let initial = Scores::new(
            clamp_score(config.initial_country_score.into()),
            clamp_score(config.initial_shoreline_score.into()),
        );
        Self {
            country_score: initial.country,
            shoreline_score: initial.shoreline,
            year: 0,
            termination: None,
            initial,
            thresholds: Thresholds {
                victory: config.victory_threshold,
                failure: config.failure_threshold,
                max_years: config.max_years,
            },
            environment: default_environment(),
            records: Vec::new(),
        }
    }

    /// Restore initial scores, year 0, default environment text and no records.
    pub fn reset(&mut self) {
        self.country_score = self.initial.country;
        self.shoreline_score = self.initial.shoreline;
        self.year = 0;
        self.termination = None;
        self.environment = default_environment();
        self.records.clear();
    }

    #[must_use]
    pub const fn scores(&self) -> Scores {
        Scores::new(self.country_score, self.shoreline_score)
    }

    #[must_use]
    pub const fn country_score(&self) -> i32 {
        self.country_score
    }

    #[must_use]
    pub const fn shoreline_score(&self) -> i32 {
        self.shoreline_score
    }

    #[must_use]
    pub const fn year(&self) -> u32 {
        self.year
    }

    #[must_use]
    pub const fn initial_scores(&self) -> Scores {
        self.initial
    }

    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    #[must_use]
    pub const fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    #[must_use]
    pub fn records(&self) -> &[YearlyRecord] {
        &self.records
    }

    #[must_use]
    pub const fn environment(&self) -> &EnvironmentFeedback {
        &self.environment
    }

    /// Start the next tick, returning the new year.
    pub fn advance_year(&mut self) -> u32 {
        self.year = self.year.saturating_add(1);
        self.year
    }

    /// Sum every delta source per axis and clamp each axis independently.
    pub fn apply_update(
        &mut self,
        arbitration: AxisDelta,
        random: AxisDelta,
        annual_bonus: i32,
    ) -> Scores {
        let country = i64::from(self.country_score)
            + i64::from(arbitration.country)
            + i64::from(random.country)
            + i64::from(annual_bonus);
        let shoreline = i64::from(self.shoreline_score)
            + i64::from(arbitration.shoreline)
            + i64::from(random.shoreline)
            + i64::from(annual_bonus);
        self.country_score = clamp_score(country);
        self.shoreline_score = clamp_score(shoreline);
        self.scores()
    }

    /// Check termination in fixed priority order: victory, failure, timeout.
    ///
    /// Once a reason is recorded it is returned unchanged on every later call.
    pub fn evaluate_termination(&mut self) -> Option<TerminationReason> {
        if self.termination.is_some() {
            return self.termination;
        }
        let reason = if self.country_score >= self.thresholds.victory {
            Some(TerminationReason::Victory)
        } else if self.shoreline_score < self.thresholds.failure {
            Some(TerminationReason::Failure)
        } else if self.year >= self.thresholds.max_years {
            Some(TerminationReason::Timeout)
        } else {
            None
        };
        self.termination = reason;
        reason
    }

    /// Replace environment text, keeping the previous value for empty sections.
    pub fn update_environment(&mut self, feedback: &EnvironmentFeedback) {
        if !feedback.opportunities.trim().is_empty() {
            self.environment.opportunities = feedback.opportunities.clone();
        }
        if !feedback.challenges.trim().is_empty() {
            self.environment.challenges = feedback.challenges.clone();
        }
    }

    /// Capture what a tick may change before its record is appended.
    #[must_use]
    pub const fn checkpoint(&self) -> TickCheckpoint {
        TickCheckpoint {
            scores: self.scores(),
            year: self.year,
        }
    }

    /// Discard a partially built tick.
    pub const fn rollback(&mut self, checkpoint: TickCheckpoint) {
        self.country_score = checkpoint.scores.country;
        self.shoreline_score = checkpoint.scores.shoreline;
        self.year = checkpoint.year;
    }

    /// Append an immutable tick snapshot.
    pub fn record(&mut self, record: YearlyRecord) {
        self.records.push(record);
    }

    /// Build the exporter-facing summary from the current state.
    #[must_use]
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            seed: None,
            initial_scores: self.initial,
            final_scores: self.scores(),
            total_years: self.year,
            termination: self.termination,
            victory: self.termination.is_some_and(TerminationReason::is_victory),
            reason: self.thresholds.describe(self.termination),
            aborted: None,
            yearly_records: self.records.clone(),
        }
    }
}

fn default_environment() -> EnvironmentFeedback {
    EnvironmentFeedback {
        opportunities: DEFAULT_OPPORTUNITIES.to_string(),
        challenges: DEFAULT_CHALLENGES.to_string(),
    }
}
