//! Centralized balance and tuning constants for the shoreline simulation.
//!
//! Defaults for injected configuration live here alongside the hard limits
//! that no configuration may override.

// Score axes ---------------------------------------------------------------
pub const SCORE_MIN: i32 = 0;
pub const SCORE_MAX: i32 = 100;

// Game defaults ------------------------------------------------------------
pub const DEFAULT_INITIAL_COUNTRY_SCORE: i32 = 60;
pub const DEFAULT_INITIAL_SHORELINE_SCORE: i32 = 100;
pub const DEFAULT_MAX_YEARS: u32 = 25;
pub const DEFAULT_VICTORY_THRESHOLD: i32 = 100;
pub const DEFAULT_FAILURE_THRESHOLD: i32 = 75;
pub const DEFAULT_ANNUAL_BONUS: i32 = 1;
pub const MAX_YEARS_LIMIT: u32 = 100;
pub const ANNUAL_BONUS_LIMIT: i32 = 10;
pub const PACING_LIMIT_SECS: u64 = 60;

// Random events ------------------------------------------------------------
/// Hard ceiling for any event probability, before or after hazard modulation.
pub const EVENT_PROBABILITY_CEILING: f64 = 0.1;
pub const EVENT_IMPACT_MIN: i32 = -3;
pub const EVENT_IMPACT_MAX: i32 = 3;

// Oracle retries -----------------------------------------------------------
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 1;
pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 10;
pub const DEFAULT_EMPTY_BACKOFF_SECS: u64 = 1;

// Environment feedback -----------------------------------------------------
pub const DEFAULT_OPPORTUNITIES: &str =
    "Coastline offers rich fisheries resources and tourism potential";
pub const DEFAULT_CHALLENGES: &str =
    "Coastal erosion and marine pollution threaten ecological balance";
