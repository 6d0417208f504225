use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use cwreport::duration::{format_duration, parse_interval};
use cwreport::{Settings, SnapshotFileSource, SnapshotSource};
use cwreport_sdk::{CloudWatchReporter, MetricRegistry};

#[derive(Parser, Debug)]
#[command(name = "cwreport")]
#[command(about = "Report metric registry snapshots to CloudWatch")]
struct Args {
    /// Settings file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the snapshot JSON file
    #[arg(short, long, default_value = "snapshot.json")]
    snapshot: PathBuf,

    /// Override the namespace from the settings
    #[arg(short, long)]
    namespace: Option<String>,

    /// Translate and log batches without delivering them
    #[arg(long)]
    dry_run: bool,

    /// Keep polling the snapshot file and report each change
    #[arg(short, long)]
    watch: bool,

    /// Poll interval in watch mode (e.g., "500ms", "10s", "1m")
    #[arg(short, long, default_value = "10s", requires = "watch")]
    interval: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug)?;

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(namespace) = args.namespace {
        settings.reporter.namespace = namespace;
    }
    if args.dry_run {
        settings.reporter.delivery_enabled = false;
    }

    let transport = settings.build_transport()?;
    let mut reporter =
        CloudWatchReporter::new(MetricRegistry::new(), settings.reporter_config(), transport)
            .context("Invalid reporter configuration")?;

    let mut source = SnapshotFileSource::new(&args.snapshot);

    if args.watch {
        let interval = parse_interval(&args.interval)
            .with_context(|| format!("Invalid interval: {}", args.interval))?;
        run_watch(&mut reporter, &mut source, interval);
        Ok(())
    } else {
        run_once(&mut reporter, &source)
    }
}

/// Report the snapshot file once
fn run_once(reporter: &mut CloudWatchReporter, source: &SnapshotFileSource) -> Result<()> {
    let snapshot = source.load()?;
    let summary = reporter.report(&snapshot)?;
    info!(
        namespace = %reporter.config().namespace,
        batches = summary.batches_delivered,
        datapoints = summary.datapoints_sent,
        "Reported snapshot"
    );
    Ok(())
}

/// Report every change to the snapshot file until the process is killed
fn run_watch(
    reporter: &mut CloudWatchReporter,
    source: &mut SnapshotFileSource,
    interval: Duration,
) {
    info!(
        source = source.description(),
        interval = %format_duration(interval),
        "Watching for snapshots"
    );
    let mut last_error: Option<String> = None;

    loop {
        match source.poll() {
            Some(snapshot) => {
                last_error = None;
                match reporter.report(&snapshot) {
                    Ok(summary) => info!(
                        batches = summary.batches_delivered,
                        datapoints = summary.datapoints_sent,
                        "Reported snapshot"
                    ),
                    Err(e) => error!(
                        namespace = %reporter.config().namespace,
                        error = %e,
                        "Reporting cycle failed"
                    ),
                }
            }
            None => {
                // Only log a source error when it changes
                let current = source.error().map(str::to_string);
                if current.is_some() && current != last_error {
                    warn!(
                        source = source.description(),
                        error = current.as_deref(),
                        "Cannot read snapshot"
                    );
                }
                last_error = current;
            }
        }

        thread::sleep(interval);
    }
}

/// Initialize logging: RUST_LOG wins, then --debug, then info
fn init_logging(debug: bool) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so the stdout transport stays machine-readable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
