use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use yaw_telemetry::{
    CommandOrientation, ConsoleSink, OrientationSource, SimulatedOrientation, Supervisor,
    TelemetryConfig,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Simulated slowly rotating yaw
    Mock,
    /// Run --sensor-command once per poll
    Command,
}

#[derive(Parser, Debug)]
#[command(name = "yaw_telemetry")]
#[command(about = "Yaw rate telemetry: windowed velocity display and durable CSV log", long_about = None)]
struct Args {
    /// Logging session length in seconds (overrides config)
    #[arg(value_name = "SECONDS")]
    duration: Option<f64>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum seconds between accepted samples
    #[arg(long)]
    accept_interval: Option<f64>,

    /// Seconds between forced log flushes
    #[arg(long)]
    flush_interval: Option<f64>,

    /// Display session length in seconds
    #[arg(long)]
    display_duration: Option<f64>,

    /// Seconds between display refreshes
    #[arg(long)]
    display_tick: Option<f64>,

    /// CSV output file
    #[arg(long)]
    output: Option<PathBuf>,

    /// End the whole session when the display session ends
    #[arg(long)]
    stop_when_display_ends: bool,

    /// Orientation source
    #[arg(long, value_enum, default_value = "mock")]
    source: SourceKind,

    /// Sensor command printing `yaw=<degrees>`, used with --source command
    #[arg(long)]
    sensor_command: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn build_config(&self) -> Result<TelemetryConfig> {
        let mut config = match &self.config {
            Some(path) => TelemetryConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TelemetryConfig::default(),
        };

        if let Some(v) = self.duration {
            config.session_duration_seconds = v;
            // A short session without an explicit display bound shortens the display too
            if self.display_duration.is_none() {
                config.display_duration_seconds = config.display_duration_seconds.min(v);
            }
        }
        if let Some(v) = self.accept_interval {
            config.accept_interval_seconds = v;
        }
        if let Some(v) = self.flush_interval {
            config.flush_interval_seconds = v;
        }
        if let Some(v) = self.display_duration {
            config.display_duration_seconds = v;
        }
        if let Some(v) = self.display_tick {
            config.display_tick_seconds = v;
        }
        if let Some(path) = &self.output {
            config.output_path = path.clone();
        }
        if self.stop_when_display_ends {
            config.stop_when_display_ends = true;
        }

        config.validate()?;
        Ok(config)
    }

    fn build_source(&self) -> Result<Box<dyn OrientationSource>> {
        match self.source {
            SourceKind::Mock => Ok(Box::new(SimulatedOrientation::default())),
            SourceKind::Command => {
                let Some(line) = &self.sensor_command else {
                    bail!("--source command requires --sensor-command");
                };
                Ok(Box::new(CommandOrientation::from_command_line(line)?))
            }
        }
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl-C, running without interrupt handling: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = args.build_config()?;
    let source = args.build_source()?;

    log::info!("Yaw telemetry starting");
    log::info!("  Session: {}s", config.session_duration_seconds);
    log::info!("  Display: {}s", config.display_duration_seconds);
    log::info!("  Accept interval: {}s", config.accept_interval_seconds);
    log::info!("  Output: {}", config.output_path.display());

    let report = Supervisor::new(config)
        .run(source, ConsoleSink, interrupt())
        .await?;

    println!("\n=== Final Stats ===");
    println!("Stopped by: {:?}", report.stop_reason);
    println!("Polls: {}", report.sampler.polls);
    println!("Accepted samples: {}", report.sampler.accepted);
    println!("Log rows: {}", report.sampler.rows_written);
    println!("Renders: {}", report.display.renders);

    match report.to_json() {
        Ok(json) => log::debug!("Session report:\n{}", json),
        Err(e) => log::warn!("Cannot serialize session report: {}", e),
    }

    Ok(())
}
