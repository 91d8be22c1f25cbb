//! Injected game configuration and its validation rules.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    ANNUAL_BONUS_LIMIT, DEFAULT_ANNUAL_BONUS, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_INITIAL_COUNTRY_SCORE, DEFAULT_INITIAL_SHORELINE_SCORE, DEFAULT_MAX_YEARS,
    DEFAULT_VICTORY_THRESHOLD, MAX_YEARS_LIMIT, PACING_LIMIT_SECS, SCORE_MAX, SCORE_MIN,
};
use crate::oracle::RetryPolicy;

/// Strategy used to decide the numeric effect of a triggered random event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImpactStrategy {
    /// Use the catalog's fixed impact values.
    Static,
    /// Ask the oracle to score each occurred event, falling back to static values.
    #[default]
    Arbitrated,
}

impl ImpactStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Arbitrated => "arbitrated",
        }
    }
}

impl fmt::Display for ImpactStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImpactStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "arbitrated" | "llm" | "oracle" => Ok(Self::Arbitrated),
            other => Err(ConfigError::UnknownImpactStrategy(other.to_string())),
        }
    }
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    #[error("pacing delay {secs}s exceeds the {limit}s limit")]
    PacingTooLong { secs: u64, limit: u64 },
    #[error("retry policy needs at least one attempt")]
    NoAttempts,
    #[error("backoff cap {cap:?} is shorter than the base backoff {base:?}")]
    BackoffCapBelowBase { base: Duration, cap: Duration },
    #[error("unknown impact strategy `{0}` (expected static or arbitrated)")]
    UnknownImpactStrategy(String),
}

/// Numeric thresholds and tick behavior for a single game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_initial_country")]
    pub initial_country_score: i32,
    #[serde(default = "GameConfig::default_initial_shoreline")]
    pub initial_shoreline_score: i32,
    #[serde(default = "GameConfig::default_max_years")]
    pub max_years: u32,
    #[serde(default = "GameConfig::default_victory_threshold")]
    pub victory_threshold: i32,
    #[serde(default = "GameConfig::default_failure_threshold")]
    pub failure_threshold: i32,
    #[serde(default = "GameConfig::default_annual_bonus")]
    pub annual_bonus: i32,
    #[serde(default)]
    pub impact_strategy: ImpactStrategy,
    #[serde(default = "GameConfig::default_random_events")]
    pub random_events: bool,
    /// Pause applied at the end of every non-final tick.
    #[serde(default)]
    pub pacing: Option<Duration>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl GameConfig {
    const fn default_initial_country() -> i32 {
        DEFAULT_INITIAL_COUNTRY_SCORE
    }

    const fn default_initial_shoreline() -> i32 {
        DEFAULT_INITIAL_SHORELINE_SCORE
    }

    const fn default_max_years() -> u32 {
        DEFAULT_MAX_YEARS
    }

    const fn default_victory_threshold() -> i32 {
        DEFAULT_VICTORY_THRESHOLD
    }

    const fn default_failure_threshold() -> i32 {
        DEFAULT_FAILURE_THRESHOLD
    }

    const fn default_annual_bonus() -> i32 {
        DEFAULT_ANNUAL_BONUS
    }

    const fn default_random_events() -> bool {
        true
    }

    /// Check every numeric field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let score_range = (i64::from(SCORE_MIN), i64::from(SCORE_MAX));
        check_range("initial_country_score", self.initial_country_score.into(), score_range)?;
        check_range(
            "initial_shoreline_score",
            self.initial_shoreline_score.into(),
            score_range,
        )?;
        check_range(
            "victory_threshold",
            self.victory_threshold.into(),
            (1, i64::from(SCORE_MAX)),
        )?;
        check_range("failure_threshold", self.failure_threshold.into(), score_range)?;
        check_range(
            "max_years",
            self.max_years.into(),
            (1, i64::from(MAX_YEARS_LIMIT)),
        )?;
        check_range(
            "annual_bonus",
            self.annual_bonus.into(),
            (0, i64::from(ANNUAL_BONUS_LIMIT)),
        )?;
        if let Some(pacing) = self.pacing
            && pacing > Duration::from_secs(PACING_LIMIT_SECS)
        {
            return Err(ConfigError::PacingTooLong {
                secs: pacing.as_secs(),
                limit: PACING_LIMIT_SECS,
            });
        }
        self.retry.validate()
    }

    /// Builder-style override for the impact strategy.
    #[must_use]
    pub const fn with_impact_strategy(mut self, strategy: ImpactStrategy) -> Self {
        self.impact_strategy = strategy;
        self
    }

    /// Builder-style override for the end-of-tick pause.
    #[must_use]
    pub const fn with_pacing(mut self, pacing: Option<Duration>) -> Self {
        self.pacing = pacing;
        self
    }
}

fn check_range(field: &'static str, value: i64, (min, max): (i64, i64)) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        })
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_country_score: Self::default_initial_country(),
            initial_shoreline_score: Self::default_initial_shoreline(),
            max_years: Self::default_max_years(),
            victory_threshold: Self::default_victory_threshold(),
            failure_threshold: Self::default_failure_threshold(),
            annual_bonus: Self::default_annual_bonus(),
            impact_strategy: ImpactStrategy::default(),
            random_events: Self::default_random_events(),
            pacing: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.initial_country_score, 60);
        assert_eq!(cfg.initial_shoreline_score, 100);
        assert_eq!(cfg.max_years, 25);
        assert_eq!(cfg.impact_strategy, ImpactStrategy::Arbitrated);
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let cfg = GameConfig {
            failure_threshold: 120,
            ..GameConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeViolation {
                field: "failure_threshold",
                ..
            })
        ));

        let cfg = GameConfig {
            max_years: 0,
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = GameConfig::default().with_pacing(Some(Duration::from_secs(61)));
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PacingTooLong {
                secs: 61,
                limit: 60
            })
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: GameConfig =
            serde_json::from_str(r#"{ "max_years": 10, "impact_strategy": "static" }"#)
                .expect("parse config");
        assert_eq!(cfg.max_years, 10);
        assert_eq!(cfg.impact_strategy, ImpactStrategy::Static);
        assert_eq!(cfg.victory_threshold, 100);
        assert!(cfg.random_events);
    }

    #[test]
    fn impact_strategy_parses_aliases() {
        assert_eq!("Static".parse::<ImpactStrategy>(), Ok(ImpactStrategy::Static));
        assert_eq!("llm".parse::<ImpactStrategy>(), Ok(ImpactStrategy::Arbitrated));
        assert!("dice".parse::<ImpactStrategy>().is_err());
    }
}
