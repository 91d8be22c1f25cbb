use anyhow::Result;
use colored::Colorize;
use shoreline_game::numbers::usize_to_f64;
use shoreline_game::{BatchReport, GameSummary};
use std::io::Write;
use std::time::Duration;

use crate::progress::outcome_label;

/// Average change per recorded year on each axis.
#[must_use]
pub fn average_yearly_change(summary: &GameSummary) -> (f64, f64) {
    let years = summary.yearly_records.len();
    if years == 0 {
        return (0.0, 0.0);
    }
    let years = usize_to_f64(years);
    let country = summary.final_scores.country - summary.initial_scores.country;
    let shoreline = summary.final_scores.shoreline - summary.initial_scores.shoreline;
    (f64::from(country) / years, f64::from(shoreline) / years)
}

fn trend_arrow(change: i32) -> &'static str {
    match change.signum() {
        1 => "↑",
        -1 => "↓",
        _ => "→",
    }
}

/// One-line trend of both scores over the whole game.
#[must_use]
pub fn trend_line(summary: &GameSummary) -> String {
    let country = summary.final_scores.country - summary.initial_scores.country;
    let shoreline = summary.final_scores.shoreline - summary.initial_scores.shoreline;
    format!(
        "Trend: country {} {country:+}, shoreline {} {shoreline:+}",
        trend_arrow(country),
        trend_arrow(shoreline)
    )
}

fn status_text(summary: &GameSummary) -> &'static str {
    if summary.is_aborted() {
        "aborted"
    } else {
        summary.termination.map_or("unfinished", |t| t.as_str())
    }
}

pub fn generate_console_report<W: Write>(
    out: &mut W,
    report: &BatchReport,
    total_duration: Duration,
) -> Result<()> {
    let stats = &report.statistics;
    writeln!(out)?;
    writeln!(out, "{}", "📊 Shoreline Batch Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==========================".cyan())?;
    writeln!(out, "Batch seed: {}", report.batch_seed)?;
    writeln!(out, "Games played: {}", stats.total_games)?;
    writeln!(out, "Victories: {}", stats.victories.to_string().green())?;
    writeln!(out, "Failures: {}", stats.failures.to_string().red())?;
    writeln!(out, "Timeouts: {}", stats.timeouts.to_string().yellow())?;
    writeln!(out, "Aborted: {}", stats.aborted.to_string().magenta())?;
    writeln!(out, "Victory rate: {:.1}%", stats.victory_rate * 100.0)?;
    writeln!(out, "Average duration: {:.1} years", stats.average_duration)?;
    writeln!(
        out,
        "Average final scores: country {:.1}, shoreline {:.1}",
        stats.average_final_country, stats.average_final_shoreline
    )?;
    writeln!(out, "Total time: {total_duration:?}")?;
    if report.cancelled {
        writeln!(out, "{}", "⚠️  Batch cancelled before completion".yellow())?;
    }
    writeln!(out)?;

    for (index, game) in report.games.iter().enumerate() {
        writeln!(
            out,
            "{} Game {} ({} years): country {}, shoreline {}",
            outcome_label(game),
            index + 1,
            game.total_years,
            game.final_scores.country,
            game.final_scores.shoreline
        )?;
        if !game.reason.is_empty() {
            writeln!(out, "   {}", game.reason)?;
        }
        if let Some(aborted) = &game.aborted {
            writeln!(out, "   {}", aborted.red())?;
        }
    }
    Ok(())
}

pub fn generate_json_report<W: Write>(out: &mut W, report: &BatchReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write>(out: &mut W, report: &BatchReport) -> Result<()> {
    let stats = &report.statistics;
    writeln!(out, "# Shoreline Batch Results\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Batch seed**: {}", report.batch_seed)?;
    writeln!(out, "- **Games**: {}", stats.total_games)?;
    writeln!(out, "- **Victories**: {}", stats.victories)?;
    writeln!(out, "- **Failures**: {}", stats.failures)?;
    writeln!(out, "- **Timeouts**: {}", stats.timeouts)?;
    writeln!(out, "- **Aborted**: {}", stats.aborted)?;
    writeln!(out, "- **Victory rate**: {:.1}%", stats.victory_rate * 100.0)?;
    writeln!(
        out,
        "- **Average duration**: {:.1} years\n",
        stats.average_duration
    )?;

    writeln!(out, "## Games\n")?;
    writeln!(out, "| Game | Seed | Outcome | Years | Country | Shoreline |")?;
    writeln!(out, "|-----:|-----:|---------|------:|--------:|----------:|")?;
    for (index, game) in report.games.iter().enumerate() {
        let seed = game.seed.map_or_else(String::new, |s| s.to_string());
        writeln!(
            out,
            "| {} | {seed} | {} | {} | {} | {} |",
            index + 1,
            status_text(game),
            game.total_years,
            game.final_scores.country,
            game.final_scores.shoreline
        )?;
    }
    Ok(())
}

/// Plain-text year-by-year score table for every game.
pub fn generate_table_report<W: Write>(out: &mut W, report: &BatchReport) -> Result<()> {
    for (index, game) in report.games.iter().enumerate() {
        writeln!(out, "Game {} ({})", index + 1, status_text(game))?;
        writeln!(
            out,
            "{:>4}  {:>7}  {:>9}  {:>8}  {:>10}",
            "Year", "Country", "Shoreline", "ΔCountry", "ΔShoreline"
        )?;
        writeln!(
            out,
            "{:>4}  {:>7}  {:>9}  {:>8}  {:>10}",
            0, game.initial_scores.country, game.initial_scores.shoreline, "", ""
        )?;
        let mut previous = game.initial_scores;
        for record in &game.yearly_records {
            writeln!(
                out,
                "{:>4}  {:>7}  {:>9}  {:>+8}  {:>+10}",
                record.year,
                record.country_score,
                record.shoreline_score,
                record.country_score - previous.country,
                record.shoreline_score - previous.shoreline
            )?;
            previous.country = record.country_score;
            previous.shoreline = record.shoreline_score;
        }
        let (country, shoreline) = average_yearly_change(game);
        writeln!(out, "{}", trend_line(game))?;
        writeln!(
            out,
            "Average yearly change: country {country:+.2}, shoreline {shoreline:+.2}"
        )?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoreline_game::{
        ArbitrationScores, BatchStatistics, Decision, EnvironmentFeedback, ScoreBreakdown, Scores,
        TerminationReason, YearlyRecord,
    };

    fn record(year: u32, country: i32, shoreline: i32) -> YearlyRecord {
        YearlyRecord {
            year,
            country_score: country,
            shoreline_score: shoreline,
            decision: Decision::new("dredge", "plant"),
            feedback: EnvironmentFeedback::default(),
            arbitration: ArbitrationScores::default(),
            events: Vec::new(),
            breakdown: ScoreBreakdown::default(),
        }
    }

    fn game() -> GameSummary {
        GameSummary {
            seed: Some(3),
            initial_scores: Scores::new(60, 100),
            final_scores: Scores::new(70, 74),
            total_years: 2,
            termination: Some(TerminationReason::Failure),
            victory: false,
            reason: String::from("shoreline fell below 75"),
            aborted: None,
            yearly_records: vec![record(1, 64, 88), record(2, 70, 74)],
        }
    }

    fn report() -> BatchReport {
        let games = vec![game()];
        BatchReport {
            batch_seed: 42,
            statistics: BatchStatistics::from_summaries(&games),
            games,
            cancelled: false,
        }
    }

    #[test]
    fn yearly_change_and_trend() {
        let (country, shoreline) = average_yearly_change(&game());
        assert!((country - 5.0).abs() < f64::EPSILON);
        assert!((shoreline + 13.0).abs() < f64::EPSILON);
        assert_eq!(trend_line(&game()), "Trend: country ↑ +10, shoreline ↓ -26");
    }

    #[test]
    fn table_lists_every_year_with_deltas() {
        let mut out = Vec::new();
        generate_table_report(&mut out, &report()).expect("table");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Game 1 (failure)"));
        assert!(text.contains("+4"));
        assert!(text.contains("-14"));
        assert!(text.contains("Average yearly change: country +5.00, shoreline -13.00"));
    }

    #[test]
    fn markdown_has_a_row_per_game() {
        let mut out = Vec::new();
        generate_markdown_report(&mut out, &report()).expect("markdown");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("# Shoreline Batch Results"));
        assert!(text.contains("| 1 | 3 | failure | 2 | 70 | 74 |"));
    }

    #[test]
    fn json_report_parses_back() {
        let mut out = Vec::new();
        generate_json_report(&mut out, &report()).expect("json");
        let parsed: BatchReport = serde_json::from_slice(&out).expect("parse");
        assert_eq!(parsed, report());
    }
}
