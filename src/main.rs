//! crowdspot: turn per-frame person detections into a calibrated crowd
//! anomaly and alert timeline.
//!
//! Usage:
//!   crowdspot run --input detections.jsonl --output-dir results
//!   crowdspot print-config
//!   crowdspot --log-format json --log-dir logs run --input detections.jsonl

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pipeline::{summary, Orchestrator, PipelineConfig};
use std::path::PathBuf;
use telemetry::{LogConfig, LogFormat};
use tracing::info;

#[derive(Parser)]
#[command(name = "crowdspot")]
#[command(about = "Crowd density anomaly detection over detector output", long_about = None)]
struct Cli {
    /// Log format on stderr: pretty, compact or json
    #[arg(long, global = true, env = "LOG_FORMAT")]
    log_format: Option<String>,

    /// Also write JSON logs to daily files in this directory
    #[arg(long, global = true, env = "LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::new("crowdspot").with_version(env!("CARGO_PKG_VERSION"));
        if let Some(format) = &self.log_format {
            config = config.with_format(LogFormat::parse(format));
        }
        if let Some(dir) = &self.log_dir {
            config = config.with_file_logging(dir.clone());
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Process a JSON-lines detection file and write the run artifacts
    Run(RunArgs),

    /// Print the effective configuration as JSON
    PrintConfig(Overrides),
}

#[derive(Args)]
struct RunArgs {
    /// JSON-lines file with one detection record per frame
    #[arg(long)]
    input: PathBuf,

    /// Directory the artifacts are written to
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Print Prometheus metrics to stdout when the run ends
    #[arg(long)]
    metrics: bool,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Args)]
struct Overrides {
    /// Zone label used on alerts
    #[arg(long, env = "CROWD_ZONE")]
    zone: Option<String>,

    /// Frames used to calibrate the baseline
    #[arg(long, env = "CROWD_CALIBRATION_WINDOW")]
    calibration_window: Option<usize>,

    /// Standard deviations above the mean that count as anomalous
    #[arg(long, env = "CROWD_SENSITIVITY")]
    sensitivity: Option<f64>,

    /// Minimum mean detection confidence for an alert
    #[arg(long, env = "CROWD_MIN_CONFIDENCE")]
    min_confidence: Option<f64>,

    /// Maximum pixel distance for continuing a track
    #[arg(long, env = "CROWD_MAX_TRACK_DISTANCE")]
    max_track_distance: Option<f64>,

    /// Alert lifetime in minutes
    #[arg(long, env = "CROWD_ALERT_TTL_MINUTES")]
    alert_ttl_minutes: Option<i64>,

    /// Detection records buffered ahead of processing
    #[arg(long, env = "CROWD_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,
}

impl Overrides {
    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(zone) = self.zone {
            config.zone = zone;
        }
        if let Some(window) = self.calibration_window {
            config.calibration_window = window;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.anomaly.sensitivity = sensitivity;
        }
        if let Some(min_confidence) = self.min_confidence {
            config.anomaly.min_confidence = min_confidence;
        }
        if let Some(distance) = self.max_track_distance {
            config.max_track_distance = distance;
        }
        if let Some(ttl) = self.alert_ttl_minutes {
            config.alerts.ttl_minutes = ttl;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = telemetry::init_structured_logging(cli.log_config())?;

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::PrintConfig(overrides) => {
            let config = overrides.apply(PipelineConfig::from_env());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = args.overrides.apply(PipelineConfig::from_env());
    config.validate().context("invalid configuration")?;
    let summarizer =
        summary::from_config(&config.summarizer).context("failed to build summarizer")?;

    info!(
        input = %args.input.display(),
        zone = %config.zone,
        calibration_window = config.calibration_window,
        summarizer = summarizer.name(),
        "Starting crowd analysis run"
    );

    let mut orchestrator = Orchestrator::new(&config, summarizer);
    let stats = pipeline::run_jsonl(&mut orchestrator, args.input.clone(), config.queue_capacity)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let report = orchestrator.finish().context("run produced no usable frames")?;
    let artifacts = report.artifacts_at(report.processed_at);
    let written = artifacts
        .write_all(&args.output_dir)
        .with_context(|| format!("failed to write artifacts to {}", args.output_dir.display()))?;

    info!(
        frames = stats.received,
        processed = stats.processed,
        skipped = stats.skipped,
        alerts = report.alerts.len(),
        files = written.len(),
        "Run complete"
    );

    if args.metrics {
        let metrics = telemetry::encode_metrics()
            .map_err(|e| anyhow::anyhow!("failed to encode metrics: {}", e))?;
        print!("{}", metrics);
    }
    Ok(())
}
