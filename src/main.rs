//! ip-failover-watch
//!
//! Keeps a floating IP on the better-connected of two servers.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                 FAILOVER CONTROLLER                   │
//!                 │                                                       │
//!   server_a ◀────┼── ssh: mtr ──┐                                        │
//!                 │              ├─▶ HealthProbe ─▶ HealthComparator      │
//!   server_b ◀────┼── ssh: mtr ──┘                        │               │
//!                 │                                       ▼               │
//!                 │                              FailoverState            │
//!                 │                            (hysteresis, holder)       │
//!                 │                                       │ Migrate       │
//!                 │                                       ▼               │
//!   target   ◀────┼── ssh: ip addr add ◀──────────── Migrator             │
//!   check_url◀────┼── http GET ◀────────────────────────  │               │
//!   source   ◀────┼── ssh: ip addr del ◀─────────────────-┘               │
//!                 │                                       │               │
//!                 │                                       ▼               │
//!   operator ◀────┼── sendmail ◀──────────────────── Alerter              │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ip_failover_watch::config::{load_config, FailoverConfig};
use ip_failover_watch::lifecycle::{build_controller, wait_for_signal, Shutdown};
use ip_failover_watch::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "ip-failover-watch", version, about = "Move a failover IP to the healthier of two servers")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "/etc/ip-failover-watch.toml")]
    config: PathBuf,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ip-failover-watch: {}", e);
            return ExitCode::from(2);
        }
    };

    if args.check_config {
        print_summary(&config);
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("ip-failover-watch: cannot initialise logging: {}", e);
        return ExitCode::from(1);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %args.config.display(), "ip-failover-watch starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                    return ExitCode::from(1);
                }
            }
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
                return ExitCode::from(1);
            }
        }
    }

    let mut controller = match build_controller(&config).await {
        Ok(controller) => controller,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::from(1);
        }
    };

    if args.once {
        let report = controller.run_cycle().await;
        tracing::info!(
            holder = %report.holder,
            decision = ?report.decision,
            outcome = report.outcome.as_ref().map(|o| o.label()),
            "Single cycle finished"
        );
        return ExitCode::SUCCESS;
    }

    let shutdown = Shutdown::new();
    let loop_handle = tokio::spawn(controller.run(shutdown.subscribe()));

    match wait_for_signal().await {
        Ok(signal) => tracing::info!(signal, "Shutdown requested"),
        Err(e) => tracing::error!(error = %e, "Signal handling failed, shutting down"),
    }
    shutdown.trigger();

    if let Err(e) = loop_handle.await {
        tracing::error!(error = %e, "Control loop task failed");
        return ExitCode::from(1);
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

fn print_summary(config: &FailoverConfig) {
    println!("configuration OK");
    println!("  failover_ip: {}", config.failover_ip);
    println!("  server_a:    {} ({})", config.server_a.ip, config.server_a.failover_eth);
    println!("  server_b:    {} ({})", config.server_b.ip, config.server_b.failover_eth);
    println!("  check_ip:    {}", config.network_health_check.check_ip);
    println!("  timeout:     {}s", config.check_timeout);
    println!(
        "  hysteresis:  {} confirmations, {} when unreachable",
        config.hysteresis.confirmations, config.hysteresis.unreachable_confirmations
    );
    println!("  alerts to:   {}", config.alert_email);
}
