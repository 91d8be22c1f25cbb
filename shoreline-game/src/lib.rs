//! Shoreline Game Engine
//!
//! Core simulation of the shoreline ecology negotiation game: a development
//! actor proposes actions, a referee scores them, the shoreline answers, and
//! random coastal events perturb both scores until the country wins, the
//! shoreline collapses, or time runs out. Every text exchange goes through an
//! injected [`Oracle`]; this crate has no network or file I/O of its own.

pub mod batch;
pub mod clock;
pub mod config;
pub mod constants;
pub mod events;
pub mod normalize;
pub mod numbers;
pub mod observer;
pub mod oracle;
pub mod orchestrator;
pub mod prompts;
pub mod seed;
pub mod state;

// Re-export commonly used types
pub use batch::{BatchReport, BatchRunner, BatchStatistics};
pub use clock::{CancelToken, Cancelled, Clock, RecordingClock, ThreadClock};
pub use config::{ConfigError, GameConfig, ImpactStrategy};
pub use events::{
    CatalogError, EventCatalog, EventDefinition, EventOutcome, EventScorer, EventStatistics,
    HazardModulator, HazardReport, HazardStep, ImpactSource, ImpactSpec, RandomEvent,
    ResolvedEvents, TriggeredEvent, resolve_impacts,
};
pub use normalize::{
    ArbitrationScores, Decision, EnvironmentFeedback, EventAssessment, Normalized, ParseIssue,
    parse_arbitration, parse_decision, parse_event_assessment, parse_feedback,
};
pub use observer::{GameObserver, LogObserver, NullObserver};
pub use oracle::{
    FailureKind, InvokeError, Oracle, OracleError, OracleInvoker, OracleRequest, OracleRole,
    RetryPolicy,
};
pub use orchestrator::{Game, GameAbort, GameError, Orchestrator};
pub use prompts::{BuiltinPrompts, PromptBook};
pub use seed::{derive_game_seed, game_rng};
pub use state::{
    AxisDelta, GameState, GameSummary, ScoreBreakdown, Scores, TerminationReason, Thresholds,
    YearlyRecord,
};
