#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Skirmish waves headlessly and streams telemetry rows.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use skirmish_core::{ArenaConfig, GameMode, RoundOutcome};
use skirmish_system_autoplay::Transition;
use skirmish_system_rounds::Session;
use skirmish_system_telemetry::{Telemetry, WriterSink};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "skirmish", about = "Plays Skirmish waves and writes telemetry rows")]
struct Cli {
    /// TOML arena configuration; the built-in arena is used when absent.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Wave list to play.
    #[arg(long, value_enum, default_value_t = ModeArg::Telemetry)]
    mode: ModeArg,
    /// Policy steering the actor outside the benchmark.
    #[arg(long, value_enum, default_value_t = AutoplayArg::Off)]
    autoplay: AutoplayArg,
    /// Overrides the configured seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Seconds per tick before the autoplay speed is applied.
    #[arg(long, default_value_t = 0.05)]
    dt: f32,
    /// Stops after this many ticks even if the run has not finished.
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: u64,
    /// CSV file receiving the rows; stdout when absent.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Normal,
    Group,
    Mixed,
    Telemetry,
}

impl From<ModeArg> for GameMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Normal => GameMode::Normal,
            ModeArg::Group => GameMode::Group,
            ModeArg::Mixed => GameMode::Mixed,
            ModeArg::Telemetry => GameMode::Telemetry,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AutoplayArg {
    Off,
    Rule,
    Smart,
}

/// Entry point for the Skirmish command-line interface.
fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skirmish=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    if !(cli.dt > 0.0 && cli.dt.is_finite()) {
        bail!("--dt must be a positive number of seconds, got {}", cli.dt);
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create output {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let telemetry = Telemetry::with_sink(Box::new(WriterSink::new(writer)));

    let mode = GameMode::from(cli.mode);
    let mut session = Session::new(&config, telemetry);
    session.switch_mode(mode);
    engage_autoplay(&mut session, mode, cli.autoplay);

    let dt = Duration::from_secs_f32(cli.dt);
    let mut ticks = 0u64;
    while !session.is_finished() && ticks < cli.max_ticks {
        session.tick(dt);
        ticks += 1;
    }
    if !session.is_finished() {
        warn!(ticks, "tick limit reached before the run finished");
    }

    session
        .telemetry_mut()
        .flush_sink()
        .context("failed to write telemetry rows")?;

    let wins = session
        .records()
        .iter()
        .filter(|record| record.outcome == RoundOutcome::Win)
        .count();
    info!(
        ticks,
        rounds = session.records().len(),
        wins,
        finished = session.is_finished(),
        "session complete"
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ArenaConfig> {
    let Some(path) = path else {
        return Ok(ArenaConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ArenaConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn engage_autoplay(session: &mut Session, mode: GameMode, autoplay: AutoplayArg) {
    if mode == GameMode::Telemetry {
        if autoplay != AutoplayArg::Off {
            warn!(?autoplay, "the benchmark selects its own policies; ignoring --autoplay");
        }
        return;
    }

    let transition = match autoplay {
        AutoplayArg::Off => return,
        AutoplayArg::Rule => session.toggle_rule(),
        AutoplayArg::Smart => session.toggle_weighted(),
    };
    if transition == Transition::Refused {
        warn!(?autoplay, "autoplay could not be engaged");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_the_benchmark_on_stdout() {
        let cli = Cli::try_parse_from(["skirmish"]).expect("defaults parse");
        assert_eq!(cli.mode, ModeArg::Telemetry);
        assert_eq!(cli.autoplay, AutoplayArg::Off);
        assert!(cli.output.is_none());
        assert_eq!(cli.dt, 0.05);
    }

    #[test]
    fn flags_map_onto_session_settings() {
        let cli = Cli::try_parse_from([
            "skirmish",
            "--mode",
            "mixed",
            "--autoplay",
            "smart",
            "--seed",
            "9",
            "--max-ticks",
            "10",
        ])
        .expect("flags parse");
        assert_eq!(GameMode::from(cli.mode), GameMode::Mixed);
        assert_eq!(cli.autoplay, AutoplayArg::Smart);
        assert_eq!(cli.seed, Some(9));
        assert_eq!(cli.max_ticks, 10);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["skirmish", "--mode", "arcade"]).is_err());
    }

    #[test]
    fn non_positive_dt_is_an_error() {
        let cli = Cli::try_parse_from(["skirmish", "--dt", "0"]).expect("parses");
        assert!(run(cli).is_err());
    }
}
