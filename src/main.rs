//! sitescout CLI - batch site selection over a JSON input file
//!
//! Runs the full pipeline for one request:
//!
//! 1. Scoring: gravity model over every candidate, ranked and filtered
//! 2. Cannibalization: impact on the trading outlets around each suggestion
//! 3. Patterns: grid / linear / radial / cluster checks, re-scored alternatives
//! 4. Rendering: colored terminal report, or JSON with --json
//!
//! Design philosophy:
//! - Config from sitescout.toml, flags override it
//! - Logs to stderr, results to stdout (safe to pipe)
//! - Verbose mode for tracing every scoring decision

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sitescout::config::EngineConfig;
use sitescout::pipeline::{SelectionRequest, SiteEngine};
use sitescout::rendering::ReportRenderer;
use sitescout::signals::TabulatedSignals;
use sitescout::store::MemoryStore;
use sitescout::types::{Candidate, DataMode, OutletRecord};

/// Site-selection scoring and spatial pattern analysis
///
/// Reads a JSON file holding the scope, candidate areas and existing outlets,
/// then ranks the candidates, estimates cannibalization of nearby outlets and
/// flags artificially regular site arrangements.
///
/// Examples:
///   sitescout request.json                  # Colored report
///   sitescout request.json --json           # Machine-readable output
///   sitescout request.json --mode live -n 5 # Top 5, live data
///   sitescout request.json --recompute      # Re-score stored candidates
#[derive(Parser, Debug)]
#[command(name = "sitescout")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// JSON input: { scope, candidates, outlets, signals?, mode?, limit?, filter? }
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Explicit config file
    ///
    /// Without this, sitescout.toml is searched from the input file's
    /// directory upwards; built-in defaults apply when none is found.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of suggestions (default 50)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Treat candidate signals as live or modeled data
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Pattern analysis radius in metres
    #[arg(short, long)]
    pub radius: Option<f64>,

    /// Seed for alternatives, jitter and simulated signals
    #[arg(long)]
    pub seed: Option<u64>,

    /// Drop suggestions scoring below this
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Re-score the input candidates and print the recompute report
    #[arg(long)]
    pub recompute: bool,

    /// Emit JSON instead of the text report
    #[arg(long)]
    pub json: bool,

    /// Print cache statistics to stderr after the run
    #[arg(long)]
    pub stats: bool,

    /// Enable colored output
    #[arg(long, default_value = "true")]
    pub color: bool,

    /// Disable colored output
    ///
    /// Equivalent to --color=false. Useful for piping to files.
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Live,
    Modeled,
}

impl From<ModeArg> for DataMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Live => DataMode::Live,
            ModeArg::Modeled => DataMode::Modeled,
        }
    }
}

/// Input file layout: a selection request plus the data it runs against.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputFile {
    #[serde(flatten)]
    request: SelectionRequest,
    #[serde(default)]
    outlets: Vec<OutletRecord>,
    /// Measured signals; simulated signals are used when absent.
    #[serde(default)]
    signals: Option<TabulatedSignals>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = run(&cli)?;
    println!("{}", output);

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sitescout=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Execute one request and return the rendered output.
fn run(cli: &Cli) -> Result<String> {
    let use_color = cli.color && !cli.no_color && !cli.json;

    let config = load_config(cli)?;
    if cli.verbose {
        eprintln!("{}", config.display_summary());
    }

    let input = read_input(&cli.input)?;
    let mut request = input.request;
    if let Some(mode) = cli.mode {
        request.mode = mode.into();
    }
    if cli.limit.is_some() {
        request.limit = cli.limit;
    }
    if cli.radius.is_some() {
        request.radius_m = cli.radius;
    }
    if cli.min_score.is_some() {
        request.filter.min_score = cli.min_score;
    }

    info!(
        candidates = request.candidates.len(),
        outlets = input.outlets.len(),
        "loaded {}",
        cli.input.display()
    );

    let mut engine = SiteEngine::new(config);
    if let Some(signals) = input.signals {
        engine = engine.with_signals(Arc::new(signals));
    }

    let output = if cli.recompute {
        let store = MemoryStore::new(input.outlets, request.candidates);
        let report = engine.scorer().recompute(&store, Some(&request.scope));
        if cli.json {
            serde_json::to_string_pretty(&report)?
        } else {
            render_recompute(&report.updated, &report.failed, report.load_error.as_deref())
        }
    } else {
        let store = MemoryStore::new(input.outlets, Vec::<Candidate>::new());
        let report = engine.run(request, &store)?;
        if cli.json {
            serde_json::to_string_pretty(&report)?
        } else {
            ReportRenderer::new(use_color).render(&report)
        }
    };

    if cli.stats {
        let stats = engine.cache_stats();
        eprintln!("Cache statistics:");
        for (name, s) in [
            ("scores", stats.scores),
            ("cannibalization", stats.cannibalization),
            ("patterns", stats.patterns),
        ] {
            eprintln!(
                "   {:<16} {} entries, {} hits, {} misses, {} evictions ({:.0}% hit rate)",
                name,
                s.entries,
                s.hits,
                s.misses,
                s.evictions,
                s.hit_rate() * 100.0
            );
        }
    }

    Ok(output)
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => {
            let dir = cli
                .input
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            EngineConfig::load(dir)
        }
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn read_input(path: &Path) -> Result<InputFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file '{}'", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid input JSON in '{}'", path.display()))
}

fn render_recompute(updated: &[String], failed: &[(String, String)], load_error: Option<&str>) -> String {
    let mut lines = Vec::new();
    if let Some(error) = load_error {
        lines.push(format!("Recompute could not load candidates: {error}"));
        return lines.join("\n");
    }
    lines.push(format!("Recomputed {} candidates, {} failed", updated.len(), failed.len()));
    for (id, reason) in failed {
        lines.push(format!("   {id}: {reason}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["sitescout", "request.json"]);
        assert_eq!(cli.input, PathBuf::from("request.json"));
        assert!(cli.color);
        assert!(!cli.json);
        assert!(cli.limit.is_none());
        assert!(cli.mode.is_none());
    }

    #[test]
    fn test_cli_parse_overrides() {
        let cli = Cli::parse_from([
            "sitescout",
            "in.json",
            "--mode",
            "live",
            "-n",
            "5",
            "--radius",
            "2500",
            "--min-score",
            "0.4",
            "--no-color",
        ]);
        assert_eq!(cli.mode, Some(ModeArg::Live));
        assert_eq!(cli.limit, Some(5));
        assert_eq!(cli.radius, Some(2_500.0));
        assert_eq!(cli.min_score, Some(0.4));
        assert!(cli.no_color);
    }

    #[test]
    fn test_input_file_parses() {
        let json = r#"{
            "scope": { "kind": "country", "value": "US" },
            "mode": "live",
            "candidates": [
                { "id": "c1", "centroid": { "lat": 40.7, "lng": -74.0 }, "population": 90000 }
            ],
            "outlets": [
                { "id": "o1", "location": { "lat": 40.71, "lng": -74.01 }, "turnover": 500000, "status": "open" }
            ]
        }"#;
        let input: InputFile = serde_json::from_str(json).unwrap();
        assert_eq!(input.request.mode, DataMode::Live);
        assert_eq!(input.request.candidates.len(), 1);
        assert_eq!(input.outlets.len(), 1);
        assert!(input.signals.is_none());
    }

    #[test]
    fn test_render_recompute() {
        let text = render_recompute(&["a".into()], &[("b".into(), "timeout".into())], None);
        assert!(text.starts_with("Recomputed 1 candidates, 1 failed"));
        assert!(text.contains("b: timeout"));
        assert!(render_recompute(&[], &[], Some("down")).contains("could not load"));
    }
}
