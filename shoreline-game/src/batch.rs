//! Sequential multi-game runs and their aggregate statistics.
use serde::{Deserialize, Serialize};

use crate::numbers::{i64_to_f64, mean_i32, usize_to_f64};
use crate::orchestrator::Orchestrator;
use crate::seed::derive_game_seed;
use crate::state::{GameSummary, TerminationReason};

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BatchStatistics {
    pub total_games: usize,
    pub victories: usize,
    /// Shoreline collapses plus aborted games.
    pub failures: usize,
    pub timeouts: usize,
    /// Games stopped by an exhausted or cancelled oracle call.
    pub aborted: usize,
    /// Victories over all games, aborted ones included.
    pub victory_rate: f64,
    /// Averages below cover completed games only.
    pub average_duration: f64,
    pub average_final_country: f64,
    pub average_final_shoreline: f64,
}

impl BatchStatistics {
    #[must_use]
    pub fn from_summaries(games: &[GameSummary]) -> Self {
        let count = |reason: TerminationReason| {
            games
                .iter()
                .filter(|g| !g.is_aborted() && g.termination == Some(reason))
                .count()
        };
        let completed: Vec<&GameSummary> = games.iter().filter(|g| !g.is_aborted()).collect();
        let victories = count(TerminationReason::Victory);
        let aborted = games.len() - completed.len();
        let durations: i64 = completed.iter().map(|g| i64::from(g.total_years)).sum();
        let countries: Vec<i32> = completed.iter().map(|g| g.final_scores.country).collect();
        let shorelines: Vec<i32> = completed.iter().map(|g| g.final_scores.shoreline).collect();
        Self {
            total_games: games.len(),
            victories,
            failures: count(TerminationReason::Failure) + aborted,
            timeouts: count(TerminationReason::Timeout),
            aborted,
            victory_rate: if games.is_empty() {
                0.0
            } else {
                usize_to_f64(victories) / usize_to_f64(games.len())
            },
            average_duration: if completed.is_empty() {
                0.0
            } else {
                i64_to_f64(durations) / usize_to_f64(completed.len())
            },
            average_final_country: mean_i32(&countries),
            average_final_shoreline: mean_i32(&shorelines),
        }
    }
}

/// Everything a batch produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_seed: u64,
    pub statistics: BatchStatistics,
    pub games: Vec<GameSummary>,
    /// The batch stopped early because of cancellation.
    pub cancelled: bool,
}

/// Runs games one after another, each with its own state and RNG.
pub struct BatchRunner<'o, 'a> {
    orchestrator: &'o Orchestrator<'a>,
    batch_seed: u64,
}

impl<'o, 'a> BatchRunner<'o, 'a> {
    #[must_use]
    pub const fn new(orchestrator: &'o Orchestrator<'a>, batch_seed: u64) -> Self {
        Self {
            orchestrator,
            batch_seed,
        }
    }

    /// Seed used for game `index`.
    #[must_use]
    pub fn game_seed(&self, index: usize) -> u64 {
        derive_game_seed(self.batch_seed, index)
    }

    #[must_use]
    pub fn run(&self, games: usize) -> BatchReport {
        self.run_with(games, |_, _| {})
    }

    /// Run `games` games, handing each finished summary to `on_game`.
    ///
    /// An exhausted oracle aborts only the game in progress. Cancellation
    /// aborts it and ends the batch.
    pub fn run_with<F>(&self, games: usize, mut on_game: F) -> BatchReport
    where
        F: FnMut(usize, &GameSummary),
    {
        let observer = self.orchestrator.observer();
        let mut summaries = Vec::with_capacity(games);
        let mut cancelled = false;
        for index in 0..games {
            if self.orchestrator.clock().is_cancelled() {
                cancelled = true;
                break;
            }
            let seed = self.game_seed(index);
            observer.on_game_started(index, seed);
            let summary = match self.orchestrator.run_game(seed) {
                Ok(summary) => summary,
                Err(abort) => {
                    cancelled = abort.error.is_cancelled();
                    abort.partial
                }
            };
            on_game(index, &summary);
            summaries.push(summary);
            if cancelled {
                break;
            }
        }
        BatchReport {
            batch_seed: self.batch_seed,
            statistics: BatchStatistics::from_summaries(&summaries),
            games: summaries,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Scores;

    fn summary(termination: Option<TerminationReason>, years: u32, final_scores: Scores) -> GameSummary {
        GameSummary {
            seed: None,
            initial_scores: Scores::new(60, 100),
            final_scores,
            total_years: years,
            termination,
            victory: termination == Some(TerminationReason::Victory),
            reason: String::new(),
            aborted: termination.is_none().then(|| String::from("oracle exhausted")),
            yearly_records: Vec::new(),
        }
    }

    #[test]
    fn statistics_split_outcomes_and_skip_aborted_in_averages() {
        let games = vec![
            summary(Some(TerminationReason::Victory), 10, Scores::new(100, 80)),
            summary(Some(TerminationReason::Failure), 6, Scores::new(70, 70)),
            summary(Some(TerminationReason::Timeout), 25, Scores::new(90, 90)),
            summary(None, 3, Scores::new(0, 0)),
        ];
        let stats = BatchStatistics::from_summaries(&games);
        assert_eq!(stats.total_games, 4);
        assert_eq!(stats.victories, 1);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.victories + stats.failures + stats.timeouts, stats.total_games);
        assert!((stats.victory_rate - 0.25).abs() < f64::EPSILON);
        assert!((stats.average_duration - 41.0 / 3.0).abs() < 1e-9);
        assert!((stats.average_final_country - 260.0 / 3.0).abs() < 1e-9);
        assert!((stats.average_final_shoreline - 80.0).abs() < 1e-9);
    }

    #[test]
    fn empty_batch_has_zeroed_statistics() {
        assert_eq!(BatchStatistics::from_summaries(&[]), BatchStatistics::default());
    }
}
