//! Relay network monitor binary.
//!
//! Discovers the relay cluster from the seed list, polls every node's
//! runtime metrics, and renders a live terminal dashboard.

use std::sync::Arc;
use std::time::Duration;

use relay_monitor::{
    App, DiscoveryService, HttpTopologySource, LocationResolver, MonitorConfig, RelayRegistry,
    StatsPoller, TuiEvent, TuiSink, probe_seeds, run_tui,
};
use tokio::sync::{RwLock, mpsc};

/// Command-line arguments for the monitor binary.
#[derive(Debug, Default)]
struct Args {
    /// Seed relay hostnames (empty = built-in defaults)
    seeds: Vec<String>,
    /// Runtime polling interval in seconds
    refresh_secs: Option<u64>,
    /// Topology rediscovery interval in seconds
    topology_secs: Option<u64>,
    /// Disable TUI (log mode only)
    quiet: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut argv = std::env::args().skip(1);

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--seed" => {
                if let Some(host) = argv.next() {
                    args.seeds.push(host);
                }
            }
            "--refresh" => {
                if let Some(secs) = argv.next() {
                    if let Ok(s) = secs.parse() {
                        args.refresh_secs = Some(s);
                    }
                }
            }
            "--topology-interval" => {
                if let Some(secs) = argv.next() {
                    if let Ok(s) = secs.parse() {
                        args.topology_secs = Some(s);
                    }
                }
            }
            "-q" | "--quiet" => args.quiet = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
    }

    args
}

fn print_help() {
    println!(
        r#"
relay-monitor - live relay cluster dashboard

USAGE:
    relay-monitor [OPTIONS]

OPTIONS:
    --seed <HOSTNAME>            Seed relay hostname (repeatable) [default: shu01-03.shugur.net]
    --refresh <SECS>             Runtime polling interval [default: 5]
    --topology-interval <SECS>   Topology rediscovery interval [default: 300]
    -q, --quiet                  Disable TUI, log mode only
    -h, --help                   Print this help message

EXAMPLES:
    # Monitor the default cluster
    relay-monitor

    # Monitor a custom cluster with faster refresh
    relay-monitor --seed relay-a.example.net --seed relay-b.example.net --refresh 2
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();

    // Auto-detect TTY availability - fall back to quiet mode if not a terminal
    let use_quiet_mode = args.quiet || !std::io::IsTerminal::is_terminal(&std::io::stdout());
    if use_quiet_mode && !args.quiet {
        eprintln!("INFO: No TTY detected, falling back to quiet mode");
    }

    // Only initialize logging for quiet mode - tracing to stderr ruins the
    // TUI interface.
    if use_quiet_mode {
        tracing_subscriber::fmt::init();
    }

    let mut config = MonitorConfig::default().with_seeds(&args.seeds);
    if let Some(secs) = args.refresh_secs {
        config.refresh_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = args.topology_secs {
        config.topology_interval = Duration::from_secs(secs.max(1));
    }

    let registry = Arc::new(RwLock::new(RelayRegistry::from_seeds(&config.seeds)));
    let resolver = Arc::new(LocationResolver::new(config.resolver_delay));

    // Use large capacity (1000) to prevent event drops during bursts.
    let (event_tx, event_rx) = mpsc::channel::<TuiEvent>(1000);

    // Startup connectivity report. Unreachable seeds stay registered;
    // they show as offline until a poll succeeds.
    let reachable = probe_seeds(&config.seeds, config.probe_timeout).await;
    tracing::info!(
        reachable = reachable.len(),
        total = config.seeds.len(),
        "seed connectivity probe complete"
    );
    let _ = event_tx
        .send(TuiEvent::Info(format!(
            "{}/{} seed relays reachable",
            reachable.len(),
            config.seeds.len()
        )))
        .await;

    let discovery = DiscoveryService::new(
        HttpTopologySource::new(config.seeds.clone(), config.topology_timeout),
        Arc::clone(&registry),
        Arc::clone(&resolver),
        Arc::new(TuiSink::new(event_tx.clone())),
        config.topology_interval,
    );
    let discovery_handle = tokio::spawn(async move {
        discovery.bootstrap().await;
        discovery.run().await;
    });

    let poller = StatsPoller::new(
        Arc::clone(&registry),
        event_tx.clone(),
        config.fetch_timeout,
        config.refresh_interval,
    );
    let poller_handle = tokio::spawn(poller.run());

    if use_quiet_mode {
        println!("Running in quiet mode (no TUI), press Ctrl+C to quit");

        // Drain the event channel so senders never block on a full queue.
        let drain = tokio::spawn(async move {
            let mut rx = event_rx;
            while rx.recv().await.is_some() {}
        });

        tokio::signal::ctrl_c().await?;
        drain.abort();
    } else {
        let app = App::new(config.max_series_points);
        run_tui(app, event_rx).await?;
    }

    discovery_handle.abort();
    poller_handle.abort();
    Ok(())
}
