use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use track_smoother::export::{self, TrackLayer, TrackSummary};
use track_smoother::map_match::{self, OsrmClient, OsrmConfig};
use track_smoother::{storage, GpsRecord, SmootherConfig, TrajectorySmoother};

#[derive(Parser, Debug)]
#[command(name = "track_smoother")]
#[command(about = "Kalman/RTS smoothing of running GPS tracks, with OSRM matching", long_about = None)]
struct Cli {
    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Smooth a .jsonl track and write the result as .jsonl
    Smooth(SmoothArgs),
    /// Send a .jsonl track to the OSRM match service
    Match(MatchArgs),
    /// Build a GeoJSON overlay from raw, smoothed and matched tracks
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct SmoothArgs {
    /// Input file, one JSON object per line (.jsonl or .jsonl.gz)
    input: PathBuf,

    /// Output file
    #[arg(long, default_value = "smoothed_data.jsonl")]
    output: PathBuf,

    /// JSON file with smoother parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Process noise variance (Q)
    #[arg(long)]
    process_noise: Option<f64>,

    /// GPS observation noise variance (R)
    #[arg(long)]
    observation_noise: Option<f64>,

    /// Prior variance of the first position
    #[arg(long)]
    initial_position_variance: Option<f64>,

    /// Prior variance of the initial velocity
    #[arg(long)]
    initial_velocity_variance: Option<f64>,

    /// Also write a raw-vs-smoothed GeoJSON overlay
    #[arg(long)]
    geojson: Option<PathBuf>,

    /// Print a raw-vs-smoothed summary as JSON
    #[arg(long)]
    summary: bool,
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Input file, one JSON object per line
    input: PathBuf,

    /// OSRM server address and port
    #[arg(long, default_value = "localhost:5050")]
    host: String,

    /// Match profile
    #[arg(long, default_value = "foot")]
    profile: String,

    /// Search radius per point (meters)
    #[arg(long, default_value_t = 20)]
    radius: u32,

    /// Request timeout (seconds)
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Where to store the raw response
    #[arg(long, default_value = "osrm_result.json")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Raw track (.jsonl)
    #[arg(long)]
    raw: PathBuf,

    /// Smoothed track (.jsonl)
    #[arg(long)]
    smoothed: Option<PathBuf>,

    /// OSRM response (.json)
    #[arg(long)]
    matched: Option<PathBuf>,

    /// GeoJSON output
    #[arg(long, default_value = "tracepoints_map.geojson")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Smooth(args) => run_smooth(&args),
        Command::Match(args) => run_match(&args).await,
        Command::Export(args) => run_export(&args),
    }
}

fn smoother_config(args: &SmoothArgs) -> Result<SmootherConfig> {
    let mut config = match &args.config {
        Some(path) => SmootherConfig::load(path)?,
        None => SmootherConfig::default(),
    };
    if let Some(v) = args.process_noise {
        config = config.with_process_noise(v);
    }
    if let Some(v) = args.observation_noise {
        config = config.with_observation_noise(v);
    }
    if let Some(v) = args.initial_position_variance {
        config = config.with_initial_position_variance(v);
    }
    if let Some(v) = args.initial_velocity_variance {
        config = config.with_initial_velocity_variance(v);
    }
    Ok(config)
}

fn positions(records: &[GpsRecord]) -> Vec<(f64, f64)> {
    records.iter().map(GpsRecord::position).collect()
}

fn run_smooth(args: &SmoothArgs) -> Result<()> {
    let smoother = TrajectorySmoother::new(smoother_config(args)?)?;
    log::debug!("Smoother config: {:?}", smoother.config());

    let records = storage::load_jsonl(&args.input);
    if records.is_empty() {
        bail!("No usable records in {}", args.input.display());
    }

    let smoothed = smoother.smooth_records(&records)?;
    storage::save_jsonl(&smoothed, &args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;

    let raw = positions(&records);
    let after = positions(&smoothed);

    if let Some(path) = &args.geojson {
        let collection = export::feature_collection(&[
            (TrackLayer::Raw, &raw[..]),
            (TrackLayer::Smoothed, &after[..]),
        ]);
        export::write_geojson(&collection, path)?;
    }

    if args.summary {
        let summary = TrackSummary::compute(&raw, &after);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

async fn run_match(args: &MatchArgs) -> Result<()> {
    let records = storage::load_jsonl(&args.input);

    let client = OsrmClient::new(OsrmConfig {
        host: args.host.clone(),
        profile: args.profile.clone(),
        radius: args.radius,
        timeout_secs: args.timeout,
    });

    let response = client.request_match(&records).await?;
    let matched = map_match::tracepoints(&response).len();
    log::info!("OSRM matched {} of {} points", matched, records.len());

    map_match::save_response(&response, &args.output)?;
    Ok(())
}

fn load_response(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn run_export(args: &ExportArgs) -> Result<()> {
    let raw = positions(&storage::load_jsonl(&args.raw));
    let smoothed = match &args.smoothed {
        Some(path) => positions(&storage::load_jsonl(path)),
        None => Vec::new(),
    };
    let matched = match &args.matched {
        Some(path) => map_match::tracepoints(&load_response(path)?),
        None => Vec::new(),
    };

    if raw.is_empty() && smoothed.is_empty() && matched.is_empty() {
        bail!("Nothing to export");
    }

    let collection = export::feature_collection(&[
        (TrackLayer::Raw, &raw[..]),
        (TrackLayer::Smoothed, &smoothed[..]),
        (TrackLayer::Matched, &matched[..]),
    ]);
    export::write_geojson(&collection, &args.output)
}
