//! JSON export of finished games.
use anyhow::{Context, Result};
use serde::Serialize;
use shoreline_game::{BatchReport, BatchStatistics, GameSummary};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const STATISTICS_FILE: &str = "game_statistics.json";

#[derive(Debug, Serialize)]
struct StatisticsExport<'a> {
    generated_at: String,
    batch_seed: u64,
    cancelled: bool,
    statistics: &'a BatchStatistics,
}

/// `game_001.json` for the first game.
#[must_use]
pub fn game_file_name(index: usize) -> String {
    format!("game_{:03}.json", index + 1)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_game(dir: &Path, index: usize, summary: &GameSummary) -> Result<PathBuf> {
    let path = dir.join(game_file_name(index));
    write_json(&path, summary)?;
    Ok(path)
}

/// Write every game plus the batch statistics into `dir`.
pub fn export_batch(dir: &Path, report: &BatchReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let mut written = Vec::with_capacity(report.games.len() + 1);
    for (index, summary) in report.games.iter().enumerate() {
        written.push(write_game(dir, index, summary)?);
    }
    let path = dir.join(STATISTICS_FILE);
    write_json(
        &path,
        &StatisticsExport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            batch_seed: report.batch_seed,
            cancelled: report.cancelled,
            statistics: &report.statistics,
        },
    )?;
    written.push(path);
    Ok(written)
}
