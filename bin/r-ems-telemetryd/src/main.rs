//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Binary entrypoint for the fleet telemetry generator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use r_ems_common::config::{AppConfig, TransportConfig, TransportKind};
use r_ems_common::logging::{init_tracing, LogFormat};
use r_ems_common::time::capture_now;
use r_ems_core::{PublishScheduler, SchedulerSettings};
use r_ems_messaging::Publication;
use r_ems_sim::device_catalog;
use r_ems_transport::{BroadcastTransport, NullTransport, Transport, WriterTransport};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const SERVICE_NAME: &str = "r-ems-telemetryd";
const DEFAULT_CONFIG_PATH: &str = "configs/telemetry.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "R-EMS fleet telemetry generator",
    long_about = "Drives a simulated fleet of battery, solar and EV charger devices through \
                  fixed-interval ticks and publishes one reading per device per tick."
)]
struct Cli {
    #[arg(long, value_name = "FILE", global = true, help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Override the number of sites")]
    sites: Option<u32>,

    #[arg(long, value_name = "SECS", global = true, help = "Override the inter-tick sleep")]
    interval_secs: Option<u64>,

    #[arg(long, global = true, help = "Stop after this many ticks")]
    ticks: Option<u64>,

    #[arg(
        long,
        env = "R_EMS_TELEMETRY_SEED",
        global = true,
        help = "Fixed RNG seed for a reproducible run"
    )]
    seed: Option<u64>,

    #[arg(long, value_enum, global = true, help = "Override the transport sink")]
    transport: Option<CliTransport>,

    #[arg(long, value_name = "FILE", global = true, help = "Output file for the file transport")]
    output: Option<PathBuf>,

    #[arg(long, value_enum, global = true, help = "Override the console log format")]
    log_format: Option<CliLogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliTransport {
    Null,
    Stdout,
    File,
    Broadcast,
}

impl From<CliTransport> for TransportKind {
    fn from(value: CliTransport) -> Self {
        match value {
            CliTransport::Null => TransportKind::Null,
            CliTransport::Stdout => TransportKind::Stdout,
            CliTransport::File => TransportKind::File,
            CliTransport::Broadcast => TransportKind::Broadcast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliLogFormat {
    Pretty,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Pretty => LogFormat::Pretty,
            CliLogFormat::Json => LogFormat::StructuredJson,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Commands {
    #[command(about = "Publish continuously until the tick limit or a termination signal")]
    Run,
    #[command(about = "Publish a single tick for every device and exit")]
    Tick,
    #[command(about = "Print the device catalog the fixture loader must seed, as JSON")]
    Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, source) = load_config(&cli)?;
    init_tracing(SERVICE_NAME, &config.logging)?;
    match &source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using built-in fleet defaults"),
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_generator(config).await?,
        Commands::Tick => run_single_tick(config)?,
        Commands::Catalog => print_catalog(&config)?,
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<(AppConfig, Option<PathBuf>)> {
    // Lookup order: --config, then R_EMS_TELEMETRY_CONFIG, then the bundled path.
    let (mut config, source) = match &cli.config {
        Some(path) => (AppConfig::from_path(path)?, Some(path.clone())),
        None => {
            let loaded = AppConfig::load_with_source(&[PathBuf::from(DEFAULT_CONFIG_PATH)])?;
            (loaded.config, loaded.source)
        }
    };
    apply_overrides(&mut config, cli);
    config
        .validate()
        .context("configuration invalid after command-line overrides")?;
    Ok((config, source))
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(sites) = cli.sites {
        config.fleet.sites = sites;
    }
    if let Some(secs) = cli.interval_secs {
        config.cadence.tick_interval = Duration::from_secs(secs);
    }
    if let Some(ticks) = cli.ticks {
        config.cadence.max_ticks = Some(ticks);
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(kind) = cli.transport {
        config.transport.kind = kind.into();
    }
    if let Some(output) = &cli.output {
        config.transport.path = Some(output.clone());
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
}

/// Build the configured sink. The broadcast sink also returns a receiver so a
/// local consumer can drain it.
fn build_transport(
    config: &TransportConfig,
) -> Result<(Box<dyn Transport>, Option<broadcast::Receiver<Publication>>)> {
    match config.kind {
        TransportKind::Null => Ok((Box::new(NullTransport), None)),
        TransportKind::Stdout => Ok((Box::new(WriterTransport::stdout()), None)),
        TransportKind::File => {
            let path = config
                .path
                .as_deref()
                .context("transport.path is required for the file transport")?;
            let transport = WriterTransport::file(path)
                .with_context(|| format!("unable to open {}", path.display()))?;
            Ok((Box::new(transport), None))
        }
        TransportKind::Broadcast => {
            let transport = BroadcastTransport::new(config.channel_capacity);
            let rx = transport.subscribe();
            Ok((Box::new(transport), Some(rx)))
        }
    }
}

/// Local consumer for the broadcast sink: logs each publication at debug.
fn spawn_broadcast_drain(mut rx: broadcast::Receiver<Publication>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(publication) => {
                    debug!(topic = %publication.topic, bytes = publication.payload.len(), "broadcast delivery");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "broadcast consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn run_generator(config: AppConfig) -> Result<()> {
    let (transport, tap) = build_transport(&config.transport)?;
    let drain = tap.map(spawn_broadcast_drain);
    let settings = SchedulerSettings::from_config(&config);
    info!(
        sites = settings.sites,
        devices = settings.device_count(),
        interval_secs = settings.cadence.tick_interval.as_secs(),
        max_ticks = ?settings.cadence.max_ticks,
        seeded = settings.seed.is_some(),
        transport = transport.name(),
        "telemetry generator starting"
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        info!("termination signal received; finishing current tick");
        let _ = shutdown_tx.send(());
    });

    let mut scheduler = PublishScheduler::new(settings, transport);
    let outcome = scheduler.run(shutdown_rx).await;
    signals.abort();
    // Dropping the scheduler closes the broadcast channel and ends the drain.
    drop(scheduler);
    if let Some(drain) = drain {
        let _ = drain.await;
    }

    let summary = outcome.context("telemetry generation aborted")?;
    info!(
        ticks = summary.ticks,
        published = summary.published,
        failed = summary.failed,
        mean_tick_ms = summary.tick_time.as_ref().map(|t| t.mean_ms),
        stopped_by = ?summary.stopped_by,
        "telemetry generator stopped"
    );
    Ok(())
}

fn run_single_tick(config: AppConfig) -> Result<()> {
    let (transport, _tap) = build_transport(&config.transport)?;
    let mut scheduler = PublishScheduler::new(SchedulerSettings::from_config(&config), transport);
    let report = scheduler
        .tick(capture_now())
        .context("telemetry generation aborted")?;
    info!(
        tick = report.tick,
        published = report.published,
        failed = report.failed,
        "single tick complete"
    );
    Ok(())
}

fn print_catalog(config: &AppConfig) -> Result<()> {
    let catalog = device_catalog(&config.fleet);
    let json = serde_json::to_string_pretty(&catalog).context("failed to encode device catalog")?;
    println!("{}", json);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn base_cli() -> Cli {
        Cli {
            config: None,
            sites: None,
            interval_secs: None,
            ticks: None,
            seed: None,
            transport: None,
            output: None,
            log_format: None,
            command: None,
        }
    }

    #[test]
    fn cli_parses_subcommands_and_globals() {
        let cli = Cli::try_parse_from([
            "r-ems-telemetryd",
            "tick",
            "--sites",
            "3",
            "--transport",
            "null",
            "--seed",
            "9",
        ])
        .expect("valid args");
        assert_eq!(cli.command, Some(Commands::Tick));
        assert_eq!(cli.sites, Some(3));
        assert_eq!(cli.transport, Some(CliTransport::Null));
        assert_eq!(cli.seed, Some(9));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = AppConfig::default();
        let mut cli = base_cli();
        cli.sites = Some(2);
        cli.interval_secs = Some(1);
        cli.ticks = Some(5);
        cli.transport = Some(CliTransport::File);
        cli.output = Some(PathBuf::from("target/out.jsonl"));
        cli.log_format = Some(CliLogFormat::Json);
        apply_overrides(&mut config, &cli);
        assert_eq!(config.fleet.sites, 2);
        assert_eq!(config.cadence.tick_interval, Duration::from_secs(1));
        assert_eq!(config.cadence.max_ticks, Some(5));
        assert_eq!(config.transport.kind, TransportKind::File);
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        config.validate().expect("still valid");
    }

    #[test]
    fn overrides_are_validated() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "[fleet]\nsites = 4").expect("write");
        let mut cli = base_cli();
        cli.config = Some(file.path().to_path_buf());
        cli.sites = Some(0);
        assert!(load_config(&cli).is_err());
        cli.sites = None;
        let (config, source) = load_config(&cli).expect("valid");
        assert_eq!(config.fleet.sites, 4);
        assert_eq!(source.as_deref(), Some(file.path()));
    }

    #[test]
    fn explicit_missing_config_is_fatal() {
        let mut cli = base_cli();
        cli.config = Some(PathBuf::from("does/not/exist.toml"));
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn explicit_config_wins_over_environment() {
        let mut from_env = NamedTempFile::new().expect("temp file");
        writeln!(from_env, "[fleet]\nsites = 2").expect("write");
        let mut explicit = NamedTempFile::new().expect("temp file");
        writeln!(explicit, "[fleet]\nsites = 4").expect("write");

        std::env::set_var(AppConfig::ENV_CONFIG_PATH, from_env.path());
        let mut cli = base_cli();
        cli.config = Some(explicit.path().to_path_buf());
        let explicit_result = load_config(&cli);
        cli.config = None;
        let implicit_result = load_config(&cli);
        std::env::remove_var(AppConfig::ENV_CONFIG_PATH);

        let (config, source) = explicit_result.expect("explicit config");
        assert_eq!(config.fleet.sites, 4);
        assert_eq!(source.as_deref(), Some(explicit.path()));
        let (config, source) = implicit_result.expect("env config");
        assert_eq!(config.fleet.sites, 2);
        assert_eq!(source.as_deref(), Some(from_env.path()));
    }

    #[test]
    fn file_transport_requires_and_uses_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = TransportConfig {
            kind: TransportKind::File,
            ..TransportConfig::default()
        };
        assert!(build_transport(&config).is_err());
        config.path = Some(dir.path().join("telemetry.jsonl"));
        let (transport, tap) = build_transport(&config).expect("file transport");
        assert_eq!(transport.name(), "file");
        assert!(tap.is_none());
    }

    #[test]
    fn broadcast_transport_exposes_a_tap() {
        let config = TransportConfig {
            kind: TransportKind::Broadcast,
            ..TransportConfig::default()
        };
        let (transport, tap) = build_transport(&config).expect("broadcast transport");
        assert_eq!(transport.name(), "broadcast");
        assert!(tap.is_some());
    }

    #[test]
    fn single_tick_runs_against_null_transport() {
        let mut config = AppConfig::default();
        config.transport.kind = TransportKind::Null;
        config.fleet.sites = 2;
        run_single_tick(config).expect("tick");
    }
}
