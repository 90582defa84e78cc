mod config;
mod render;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swarm_client::{DeviceCommand, HttpSwarmSource, LogFilter, LogLevel, SwarmSource};
use telemetry_sync::{
    LivenessTracker, LogTailer, Pipeline, Subscription, SyncMetrics, TelemetryPoller,
    WindowCapacity,
};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "swarmctl",
    version,
    about = "Swarm monitor CLI",
    disable_help_subcommand = true
)]
struct Cli {
    /// JSON configuration file, created with defaults if missing
    #[arg(long, global = true, default_value = "swarmctl.json")]
    config: PathBuf,

    /// Receiver address (overrides the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show device presence
    Devices {
        /// Keep refreshing until interrupted
        #[arg(long, action = ArgAction::SetTrue)]
        watch: bool,
    },
    /// Stream live sensor series
    Live {
        /// Relayed device to read instead of the receiver's own sensors
        #[arg(long)]
        mac: Option<String>,
        /// Points kept per series (50..=2000)
        #[arg(long)]
        capacity: Option<usize>,
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Print the log ring
    Logs {
        #[arg(long, default_value_t = LogLevel::All)]
        level: LogLevel,
        /// Only entries from this sender
        #[arg(long)]
        sender: Option<String>,
        /// Keep tailing new entries until interrupted
        #[arg(long, action = ArgAction::SetTrue)]
        follow: bool,
    },
    /// List sensor functions and their state
    Settings,
    /// Enable or disable a sensor function
    Toggle {
        #[arg(long)]
        function: String,
        #[arg(long, action = ArgAction::Set)]
        enabled: bool,
    },
    /// Make a device identify itself
    Locate {
        #[arg(long)]
        mac: String,
    },
    /// Drive a device forward
    Forward {
        #[arg(long)]
        mac: String,
    },
    /// Stop a device
    Stop {
        #[arg(long)]
        mac: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let mut config = Config::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    let source: Arc<dyn SwarmSource> = Arc::new(
        HttpSwarmSource::with_timeout(&config.base_url, config.request_timeout())
            .context("creating backend client")?,
    );
    let metrics = SyncMetrics::new()?;
    let token = shutdown_token();

    let outcome = match cli.command {
        Commands::Devices { watch } => {
            devices(source, &config, metrics.clone(), watch, &token).await
        }
        Commands::Live {
            mac,
            capacity,
            seconds,
        } => {
            let capacity = WindowCapacity::new(capacity.unwrap_or(config.window_capacity));
            live(source, &config, metrics.clone(), mac, capacity, seconds, &token).await
        }
        Commands::Logs {
            level,
            sender,
            follow,
        } => {
            let filter = LogFilter::new(level, sender);
            logs(source, &config, metrics.clone(), filter, follow, &token).await
        }
        Commands::Settings => settings(source.as_ref()).await,
        Commands::Toggle { function, enabled } => toggle(source.as_ref(), &function, enabled).await,
        Commands::Locate { mac } => command(source.as_ref(), DeviceCommand::Locate, &mac).await,
        Commands::Forward { mac } => command(source.as_ref(), DeviceCommand::Forward, &mac).await,
        Commands::Stop { mac } => command(source.as_ref(), DeviceCommand::Stop, &mac).await,
    };

    if cli.metrics {
        print!("{}", metrics.encode_text());
    }
    outcome
}

fn setup_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Token cancelled on Ctrl-C.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, stopping");
            trigger.cancel();
        }
    });
    token
}

/// Calls `render` every `period` until `token` fires or `limit` elapses.
async fn render_until<F>(
    token: &CancellationToken,
    period: Duration,
    limit: Option<Duration>,
    mut render: F,
) where
    F: FnMut(),
{
    let deadline = limit.map(|limit| Instant::now() + limit);
    let mut interval = time::interval(period);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = deadline_reached(deadline) => break,
            _ = interval.tick() => render(),
        }
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn devices(
    source: Arc<dyn SwarmSource>,
    config: &Config,
    metrics: SyncMetrics,
    watch: bool,
    token: &CancellationToken,
) -> Result<()> {
    let mut tracker = LivenessTracker::new(source, &config.intervals).with_metrics(metrics);
    let view = tracker.view();
    if !watch {
        tracker.tick().await.context("fetching device list")?;
        print!("{}", render::devices(&view.read()));
        return Ok(());
    }

    let ticker = tracker.ticker();
    let subscription = Subscription::spawn(tracker, ticker);
    render_until(token, config.intervals.swarm(), None, || {
        println!("{}", render::devices(&view.read()));
    })
    .await;
    subscription.stop().await;
    Ok(())
}

async fn live(
    source: Arc<dyn SwarmSource>,
    config: &Config,
    metrics: SyncMetrics,
    mac: Option<String>,
    capacity: WindowCapacity,
    seconds: Option<u64>,
    token: &CancellationToken,
) -> Result<()> {
    info!(capacity = capacity.get(), device = ?mac, "streaming sensor values");
    let poller = TelemetryPoller::new(source, mac, &config.intervals, capacity)
        .with_metrics(metrics)
        .on_series_registered(|series| {
            info!(
                sensor = %series.sensor_name,
                label = %series.label,
                index = series.index,
                "new series"
            );
        });
    let view = poller.view();
    let ticker = poller.ticker();
    let subscription = Subscription::spawn(poller, ticker);

    render_until(
        token,
        Duration::from_secs(1),
        seconds.map(Duration::from_secs),
        || println!("{}", render::series(&view.read())),
    )
    .await;
    subscription.stop().await;
    Ok(())
}

async fn logs(
    source: Arc<dyn SwarmSource>,
    config: &Config,
    metrics: SyncMetrics,
    filter: LogFilter,
    follow: bool,
    token: &CancellationToken,
) -> Result<()> {
    let (tailer, _handle) = LogTailer::new(source, filter, config.intervals.logs());
    let mut tailer = tailer.with_metrics(metrics);
    let view = tailer.view();
    if !follow {
        tailer.tick().await.context("fetching logs")?;
        for entry in &view.read().entries {
            println!("{}", render::log_entry(entry));
        }
        return Ok(());
    }

    let ticker = tailer.ticker();
    let subscription = Subscription::spawn(tailer, ticker);
    let mut printed = 0;
    render_until(token, config.intervals.logs(), None, || {
        let view = view.read();
        if view.entries.len() < printed {
            printed = 0;
        }
        for entry in &view.entries[printed..] {
            println!("{}", render::log_entry(entry));
        }
        printed = view.entries.len();
    })
    .await;
    subscription.stop().await;
    Ok(())
}

async fn settings(source: &dyn SwarmSource) -> Result<()> {
    let groups = source
        .sensor_settings()
        .await
        .context("fetching sensor settings")?;
    print!("{}", render::settings(&groups));
    Ok(())
}

async fn toggle(source: &dyn SwarmSource, function: &str, enabled: bool) -> Result<()> {
    source
        .toggle_function(function, enabled)
        .await
        .with_context(|| format!("toggling {function}"))?;
    println!("{function}: {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

async fn command(source: &dyn SwarmSource, command: DeviceCommand, mac: &str) -> Result<()> {
    source
        .send_command(command, mac)
        .await
        .with_context(|| format!("sending {command} to {mac}"))?;
    println!("{command}: sent to {mac}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "swarmctl",
            "logs",
            "--level",
            "error",
            "--sender",
            "AA:01",
            "--follow",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Logs {
                level: LogLevel::Error,
                ref sender,
                follow: true,
            } if sender.as_deref() == Some("AA:01")
        ));
        assert_eq!(cli.config, PathBuf::from("swarmctl.json"));
    }

    #[test]
    fn test_cli_toggle_requires_explicit_state() {
        let cli = Cli::try_parse_from([
            "swarmctl",
            "--base-url",
            "http://10.0.0.7",
            "toggle",
            "--function",
            "Light Ambient",
            "--enabled",
            "false",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://10.0.0.7"));
        assert!(matches!(cli.command, Commands::Toggle { enabled: false, .. }));
        assert!(Cli::try_parse_from(["swarmctl", "toggle", "--function", "x"]).is_err());
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        assert!(Cli::try_parse_from(["swarmctl", "logs", "--level", "loud"]).is_err());
    }
}
