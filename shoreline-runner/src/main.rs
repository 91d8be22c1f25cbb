mod export;
mod oracle;
mod progress;
mod reports;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use shoreline_game::{
    BatchReport, BatchRunner, BuiltinPrompts, CancelToken, GameConfig, ImpactStrategy, Oracle,
    Orchestrator, ThreadClock,
};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use oracle::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use oracle::{OpenAiOracle, OpenAiSettings, ScriptedOracle};
use progress::ConsoleObserver;

const INTERACTIVE_PACING_SECS: u64 = 5;
const CANCELLED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OracleKind {
    /// OpenAI-compatible chat completions endpoint
    Openai,
    /// Offline deterministic replies (no network)
    Scripted,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "shoreline-runner", version = "0.1.0")]
#[command(about = "Run the Shoreline ecology negotiation game against a language model")]
struct Args {
    /// Number of games to play in sequence
    #[arg(long, default_value_t = 1)]
    games: usize,

    /// Batch seed; each game derives its own seed from it (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Year limit per game
    #[arg(long, default_value_t = 25)]
    max_years: u32,

    /// How random event impacts are decided: static or arbitrated
    #[arg(long, default_value = "arbitrated")]
    impact_strategy: String,

    /// Disable random coastal events
    #[arg(long)]
    no_random_events: bool,

    /// Pause between years, in seconds
    #[arg(long)]
    pacing_secs: Option<u64>,

    /// Interactive pacing: pause between years unless --pacing-secs is given
    #[arg(long)]
    interactive: bool,

    /// Attempts per oracle call before the game is aborted
    #[arg(long, default_value_t = 5)]
    max_attempts: u32,

    /// Which oracle answers the prompts
    #[arg(long, value_enum, default_value_t = OracleKind::Openai)]
    oracle: OracleKind,

    /// Scripted oracle only: always answer in the canonical format
    #[arg(long)]
    plain_replies: bool,

    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Model name sent with every request
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Optional system prompt sent with every request
    #[arg(long)]
    system_prompt: Option<String>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json", "markdown", "table"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory receiving game_NNN.json and game_statistics.json
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print every year and event as it happens
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    announce_banner();

    let batch_seed = args.seed.unwrap_or_else(clock_seed);
    println!("🎲 Batch seed: {}", batch_seed.to_string().bold());

    let token = CancelToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "🛑 Interrupted, stopping after the current step".yellow());
            signal_token.cancel();
        }
    });

    let start_time = Instant::now();
    let run_args = args.clone();
    let report = tokio::task::spawn_blocking(move || run_batch(&run_args, batch_seed, token))
        .await
        .context("batch worker panicked")??;

    if let Some(dir) = &args.export_dir {
        let written = export::export_batch(dir, &report)?;
        println!("💾 Exported {} files to {}", written.len(), dir.display());
    }

    write_reports(&args, &report, start_time)?;

    if report.cancelled {
        std::process::exit(CANCELLED_EXIT_CODE);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "🌊 Shoreline Negotiation Runner".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn clock_seed() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

fn build_config(args: &Args) -> Result<GameConfig> {
    let strategy: ImpactStrategy = args.impact_strategy.parse()?;
    let pacing = match (args.pacing_secs, args.interactive) {
        (Some(0), _) | (None, false) => None,
        (Some(secs), _) => Some(Duration::from_secs(secs)),
        (None, true) => Some(Duration::from_secs(INTERACTIVE_PACING_SECS)),
    };
    let mut config = GameConfig {
        max_years: args.max_years,
        random_events: !args.no_random_events,
        ..GameConfig::default()
    }
    .with_impact_strategy(strategy)
    .with_pacing(pacing);
    config.retry = config.retry.with_max_attempts(args.max_attempts);
    config.validate()?;
    Ok(config)
}

fn build_oracle(args: &Args, batch_seed: u64) -> Result<Box<dyn Oracle>> {
    match args.oracle {
        OracleKind::Scripted => {
            let scripted = ScriptedOracle::new(batch_seed);
            if args.plain_replies {
                Ok(Box::new(scripted.without_noise()))
            } else {
                Ok(Box::new(scripted))
            }
        }
        OracleKind::Openai => {
            let Some(api_key) = args.api_key.clone().filter(|key| !key.trim().is_empty()) else {
                bail!("an API key is required for the openai oracle (--api-key or OPENAI_API_KEY)");
            };
            let oracle = OpenAiOracle::new(OpenAiSettings {
                api_key,
                base_url: args.base_url.clone(),
                model: args.model.clone(),
                timeout: Duration::from_secs(args.timeout_secs),
            })?;
            log::info!("using {} at {}", oracle.model(), oracle.endpoint());
            Ok(Box::new(oracle))
        }
    }
}

fn run_batch(args: &Args, batch_seed: u64, token: CancelToken) -> Result<BatchReport> {
    let config = build_config(args)?;
    let oracle = build_oracle(args, batch_seed)?;
    let prompts = BuiltinPrompts::default().with_system_prompt(args.system_prompt.clone());
    let clock = ThreadClock::new(token);
    let observer = ConsoleObserver::new(args.verbose);
    let orchestrator = Orchestrator::new(config, oracle.as_ref(), &prompts, &clock, &observer)?;
    Ok(BatchRunner::new(&orchestrator, batch_seed).run(args.games))
}

fn write_reports(args: &Args, report: &BatchReport, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report)?,
        "table" => reports::generate_table_report(&mut output_target, report)?,
        _ => {
            reports::generate_console_report(&mut output_target, report, start_time.elapsed())?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoreline_game::{OracleRequest, OracleRole};

    fn base_args() -> Args {
        Args::parse_from(["shoreline-runner", "--oracle", "scripted"])
    }

    #[test]
    fn defaults_match_the_library_config() {
        let config = build_config(&base_args()).expect("valid config");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn interactive_mode_paces_unless_overridden() {
        let mut args = base_args();
        args.interactive = true;
        assert_eq!(
            build_config(&args).expect("valid").pacing,
            Some(Duration::from_secs(INTERACTIVE_PACING_SECS))
        );
        args.pacing_secs = Some(0);
        assert_eq!(build_config(&args).expect("valid").pacing, None);
        args.pacing_secs = Some(2);
        assert_eq!(
            build_config(&args).expect("valid").pacing,
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn flags_reach_the_config() {
        let args = Args::parse_from([
            "shoreline-runner",
            "--max-years",
            "10",
            "--impact-strategy",
            "static",
            "--no-random-events",
            "--max-attempts",
            "2",
        ]);
        let config = build_config(&args).expect("valid config");
        assert_eq!(config.max_years, 10);
        assert_eq!(config.impact_strategy, ImpactStrategy::Static);
        assert!(!config.random_events);
        assert_eq!(config.retry.max_attempts, 2);
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let mut args = base_args();
        args.max_years = 0;
        assert!(build_config(&args).is_err());
        let mut args = base_args();
        args.impact_strategy = String::from("vibes");
        assert!(build_config(&args).is_err());
        let mut args = base_args();
        args.pacing_secs = Some(120);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn openai_oracle_requires_a_key() {
        let mut args = base_args();
        args.oracle = OracleKind::Openai;
        args.api_key = Some(String::from("  "));
        assert!(build_oracle(&args, 1).is_err());
    }

    #[test]
    fn plain_replies_use_the_canonical_format() {
        let args = Args::parse_from(["shoreline-runner", "--oracle", "scripted", "--plain-replies"]);
        let oracle = build_oracle(&args, 11).expect("scripted oracle");
        for year in 0..12 {
            let request = OracleRequest::new(OracleRole::Decision, format!("year {year}"));
            let reply = oracle.invoke(&request).expect("scripted oracle never fails");
            assert!(reply.starts_with("ACTION_1: "), "{reply}");
        }
    }

    #[test]
    fn scripted_batch_runs_offline() {
        let mut args = base_args();
        args.games = 2;
        args.max_years = 5;
        let report = run_batch(&args, 7, CancelToken::new()).expect("batch runs");
        assert_eq!(report.games.len(), 2);
        assert_eq!(report.statistics.aborted, 0);
        assert!(report.games.iter().all(|g| g.total_years <= 5));
    }
}
