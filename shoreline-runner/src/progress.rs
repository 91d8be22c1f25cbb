use colored::Colorize;
use shoreline_game::{
    EventOutcome, FailureKind, GameObserver, GameSummary, HazardReport, InvokeError, LogObserver,
    OracleRole, ParseIssue, Scores, TerminationReason, YearlyRecord,
};
use std::time::Duration;

/// Colored console progress on top of the `log` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver {
    log: LogObserver,
    verbose: bool,
}

impl ConsoleObserver {
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self {
            log: LogObserver,
            verbose,
        }
    }
}

#[must_use]
pub fn outcome_label(summary: &GameSummary) -> colored::ColoredString {
    if summary.is_aborted() {
        return "ABORTED".magenta().bold();
    }
    match summary.termination {
        Some(TerminationReason::Victory) => "VICTORY".green().bold(),
        Some(TerminationReason::Failure) => "FAILURE".red().bold(),
        Some(TerminationReason::Timeout) => "TIMEOUT".yellow().bold(),
        None => "UNFINISHED".dimmed(),
    }
}

impl GameObserver for ConsoleObserver {
    fn on_game_started(&self, game_index: usize, seed: u64) {
        self.log.on_game_started(game_index, seed);
        println!(
            "{} game {} (seed {seed})",
            "🌊".cyan(),
            (game_index + 1).to_string().bold()
        );
    }

    fn on_tick_started(&self, year: u32, scores: Scores) {
        self.log.on_tick_started(year, scores);
    }

    fn on_oracle_retry(
        &self,
        role: OracleRole,
        attempt: u32,
        max_attempts: u32,
        failure: &FailureKind,
        wait: Option<Duration>,
    ) {
        self.log
            .on_oracle_retry(role, attempt, max_attempts, failure, wait);
        if self.verbose {
            eprintln!(
                "   ⚠️  {role} attempt {attempt}/{max_attempts}: {}",
                failure.to_string().yellow()
            );
        }
    }

    fn on_parse_issue(&self, role: OracleRole, issue: &ParseIssue) {
        self.log.on_parse_issue(role, issue);
    }

    fn on_hazard_modulated(&self, report: &HazardReport) {
        self.log.on_hazard_modulated(report);
    }

    fn on_event_occurred(&self, event: &EventOutcome) {
        self.log.on_event_occurred(event);
        if self.verbose {
            println!(
                "   ⚡ {} ({:+} country, {:+} shoreline)",
                event.name.bright_yellow(),
                event.country_impact,
                event.shoreline_impact
            );
        }
    }

    fn on_arbitration_fallback(&self, event_id: &str, error: &InvokeError) {
        self.log.on_arbitration_fallback(event_id, error);
    }

    fn on_tick_recorded(&self, record: &YearlyRecord) {
        self.log.on_tick_recorded(record);
        if self.verbose {
            println!(
                "   Year {:>2}: country {:>3}, shoreline {:>3}",
                record.year, record.country_score, record.shoreline_score
            );
        }
    }

    fn on_game_finished(&self, summary: &GameSummary) {
        self.log.on_game_finished(summary);
        println!(
            "   {} after {} years: country {}, shoreline {}",
            outcome_label(summary),
            summary.total_years,
            summary.final_scores.country,
            summary.final_scores.shoreline
        );
        if let Some(reason) = &summary.aborted {
            eprintln!("   ❌ {}", reason.red());
        }
    }
}
