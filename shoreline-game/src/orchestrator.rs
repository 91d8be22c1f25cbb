//! Turn sequencer: one synchronous pass per simulated year.
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::{ConfigError, GameConfig};
use crate::events::{
    EventCatalog, EventDefinition, EventScorer, HazardModulator, RandomEvent, ResolvedEvents,
    builtin_definitions, resolve_impacts,
};
use crate::normalize::{
    EventAssessment, Normalized, parse_arbitration, parse_decision, parse_event_assessment,
    parse_feedback,
};
use crate::observer::GameObserver;
use crate::oracle::{InvokeError, Oracle, OracleInvoker, OracleRequest, OracleRole};
use crate::prompts::PromptBook;
use crate::seed::game_rng;
use crate::state::{
    GameState, GameSummary, ScoreBreakdown, Scores, TerminationReason, YearlyRecord,
};

/// Why a game stopped without reaching a termination reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("year {year}: {role} oracle failed: {source}")]
    Oracle {
        year: u32,
        role: OracleRole,
        #[source]
        source: InvokeError,
    },
    #[error("game cancelled during year {year}")]
    Cancelled { year: u32 },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl GameError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    fn from_invoke(year: u32, role: OracleRole, source: InvokeError) -> Self {
        match source {
            InvokeError::Cancelled => Self::Cancelled { year },
            source => Self::Oracle { year, role, source },
        }
    }
}

/// A game that was aborted, with everything recorded before the failing tick.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct GameAbort {
    pub error: GameError,
    pub partial: GameSummary,
}

/// Game-independent collaborators and configuration.
pub struct Orchestrator<'a> {
    config: GameConfig,
    oracle: &'a dyn Oracle,
    prompts: &'a dyn PromptBook,
    clock: &'a dyn Clock,
    observer: &'a dyn GameObserver,
    hazard: HazardModulator,
    definitions: Vec<EventDefinition>,
}

impl<'a> Orchestrator<'a> {
    /// # Errors
    ///
    /// Returns [`GameError::Config`] when the configuration is out of range.
    pub fn new(
        config: GameConfig,
        oracle: &'a dyn Oracle,
        prompts: &'a dyn PromptBook,
        clock: &'a dyn Clock,
        observer: &'a dyn GameObserver,
    ) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            config,
            oracle,
            prompts,
            clock,
            observer,
            hazard: HazardModulator::default(),
            definitions: builtin_definitions().to_vec(),
        })
    }

    /// Replace the bundled event definitions.
    #[must_use]
    pub fn with_definitions(mut self, definitions: Vec<EventDefinition>) -> Self {
        self.definitions = definitions;
        self
    }

    #[must_use]
    pub fn with_hazard(mut self, hazard: HazardModulator) -> Self {
        self.hazard = hazard;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn observer(&self) -> &'a dyn GameObserver {
        self.observer
    }

    #[must_use]
    pub const fn clock(&self) -> &'a dyn Clock {
        self.clock
    }

    /// Fresh state, catalog and RNG for one game.
    #[must_use]
    pub fn new_game(&self, seed: u64) -> Game<'_, 'a> {
        let mut rng = game_rng(seed);
        let catalog = EventCatalog::from_definitions(self.definitions.clone(), &mut rng);
        let mut state = GameState::new(&self.config);
        state.evaluate_termination();
        Game {
            orchestrator: self,
            seed,
            state,
            catalog,
            rng,
        }
    }

    /// Play one game to termination.
    ///
    /// # Errors
    ///
    /// Returns a [`GameAbort`] when the oracle exhausted its retries or the
    /// game was cancelled.
    pub fn run_game(&self, seed: u64) -> Result<GameSummary, GameAbort> {
        self.new_game(seed).run()
    }

    fn invoker(&self) -> OracleInvoker<'a> {
        OracleInvoker::new(
            self.oracle,
            self.clock,
            self.observer,
            self.config.retry.clone(),
        )
    }

    fn request(&self, role: OracleRole, prompt: String) -> OracleRequest {
        OracleRequest::new(role, prompt).with_system_prompt(self.prompts.system_prompt(role))
    }

    fn report<T>(&self, role: OracleRole, parsed: Normalized<T>) -> T {
        for issue in &parsed.issues {
            self.observer.on_parse_issue(role, issue);
        }
        parsed.value
    }
}

/// Scores occurred events through the oracle.
struct OracleEventScorer<'o, 'a> {
    orchestrator: &'o Orchestrator<'a>,
    invoker: &'o OracleInvoker<'a>,
}

impl EventScorer for OracleEventScorer<'_, '_> {
    fn assess(&self, event: &RandomEvent, scores: Scores) -> Result<EventAssessment, InvokeError> {
        let prompt = self.orchestrator.prompts.event_arbitration(event, scores);
        let request = self
            .orchestrator
            .request(OracleRole::EventArbitration, prompt);
        let text = self.invoker.invoke(&request)?;
        Ok(self.orchestrator.report(
            OracleRole::EventArbitration,
            parse_event_assessment(&text),
        ))
    }
}

/// One game in progress.
pub struct Game<'o, 'a> {
    orchestrator: &'o Orchestrator<'a>,
    seed: u64,
    state: GameState,
    catalog: EventCatalog,
    rng: ChaCha20Rng,
}

impl Game<'_, '_> {
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Tick until a termination reason is recorded.
    ///
    /// # Errors
    ///
    /// Returns a [`GameAbort`] carrying the partial summary on oracle
    /// exhaustion or cancellation.
    pub fn run(mut self) -> Result<GameSummary, GameAbort> {
        let observer = self.orchestrator.observer;
        while !self.state.is_terminated() {
            if let Err(error) = self.tick() {
                let mut partial = self.summary();
                partial.aborted = Some(error.to_string());
                observer.on_game_finished(&partial);
                return Err(GameAbort { error, partial });
            }
        }
        let summary = self.summary();
        observer.on_game_finished(&summary);
        Ok(summary)
    }

    #[must_use]
    pub fn summary(&self) -> GameSummary {
        let mut summary = self.state.summary();
        summary.seed = Some(self.seed);
        summary
    }

    /// Play one year. A failed tick leaves scores and year as they were
    /// before it started.
    ///
    /// # Errors
    ///
    /// Returns [`GameError`] when an oracle call is exhausted or cancelled.
    pub fn tick(&mut self) -> Result<Option<TerminationReason>, GameError> {
        if self.state.is_terminated() {
            return Ok(self.state.termination());
        }
        let checkpoint = self.state.checkpoint();
        let outcome = match self.play_year() {
            Ok(outcome) => outcome,
            Err(error) => {
                self.state.rollback(checkpoint);
                return Err(error);
            }
        };
        if outcome.is_none() {
            self.end_of_year()?;
        }
        Ok(outcome)
    }

    /// Pacing pause, then a fresh catalog for the next year. The finished
    /// year stays recorded even if the pause is interrupted.
    fn end_of_year(&mut self) -> Result<(), GameError> {
        let orch = self.orchestrator;
        if let Some(pacing) = orch.config.pacing {
            orch.clock
                .sleep(pacing)
                .map_err(|_| GameError::Cancelled {
                    year: self.state.year(),
                })?;
        }
        self.catalog.reinitialize(&mut self.rng);
        Ok(())
    }

    fn play_year(&mut self) -> Result<Option<TerminationReason>, GameError> {
        let orch = self.orchestrator;
        let invoker = orch.invoker();
        let year = self.state.advance_year();
        orch.observer.on_tick_started(year, self.state.scores());
        self.check_cancelled(year)?;

        let prompt = orch.prompts.decision(self.state.scores(), self.state.environment());
        let text = invoker
            .invoke(&orch.request(OracleRole::Decision, prompt))
            .map_err(|e| GameError::from_invoke(year, OracleRole::Decision, e))?;
        let decision = orch.report(OracleRole::Decision, parse_decision(&text));
        self.check_cancelled(year)?;

        let prompt = orch.prompts.arbitration(&decision);
        let text = invoker
            .invoke(&orch.request(OracleRole::Arbitration, prompt))
            .map_err(|e| GameError::from_invoke(year, OracleRole::Arbitration, e))?;
        let arbitration = orch.report(OracleRole::Arbitration, parse_arbitration(&text));
        self.check_cancelled(year)?;

        let events = if orch.config.random_events {
            let report = orch
                .hazard
                .modulate(&mut self.catalog, self.state.shoreline_score());
            orch.observer.on_hazard_modulated(&report);
            let triggered = self.catalog.trigger(&mut self.rng);
            let scorer = OracleEventScorer {
                orchestrator: orch,
                invoker: &invoker,
            };
            resolve_impacts(
                triggered,
                orch.config.impact_strategy,
                &scorer,
                self.state.scores(),
                orch.observer,
            )
            .map_err(|_| GameError::Cancelled { year })?
        } else {
            ResolvedEvents::default()
        };

        let breakdown = ScoreBreakdown {
            arbitration: arbitration.total(),
            random: events.total,
            annual_bonus: orch.config.annual_bonus,
        };
        self.state.apply_update(
            breakdown.arbitration,
            breakdown.random,
            breakdown.annual_bonus,
        );
        self.check_cancelled(year)?;

        let prompt = orch.prompts.environment(&decision);
        let text = invoker
            .invoke(&orch.request(OracleRole::Environment, prompt))
            .map_err(|e| GameError::from_invoke(year, OracleRole::Environment, e))?;
        let feedback = orch.report(OracleRole::Environment, parse_feedback(&text));
        self.state.update_environment(&feedback);

        let scores = self.state.scores();
        let record = YearlyRecord {
            year,
            country_score: scores.country,
            shoreline_score: scores.shoreline,
            decision,
            feedback,
            arbitration,
            events: events.outcomes,
            breakdown,
        };
        orch.observer.on_tick_recorded(&record);
        self.state.record(record);

        Ok(self.state.evaluate_termination())
    }

    fn check_cancelled(&self, year: u32) -> Result<(), GameError> {
        if self.orchestrator.clock.is_cancelled() {
            Err(GameError::Cancelled { year })
        } else {
            Ok(())
        }
    }
}
