//! Cadence CLI - apply payload workloads and gate upgrades on preconditions

use cadence_core::BuilderMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author = "Cadence Contributors")]
#[command(version)]
#[command(about = "Apply and verify cluster payload workloads", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Mutate, submit and verify Deployment and DaemonSet manifests
    Apply {
        /// Manifest file(s), multi-document YAML allowed
        #[arg(short = 'f', long = "filename", required = true)]
        files: Vec<PathBuf>,

        /// Builder mode: applying verifies health, initializing only submits
        #[arg(long, env = "CADENCE_MODE", default_value = "applying")]
        mode: BuilderMode,

        /// Keep verifying until each workload is healthy
        #[arg(long)]
        wait: bool,

        /// Give up waiting after this many seconds
        #[arg(long, env = "CADENCE_WAIT_TIMEOUT", default_value_t = 300)]
        timeout: u64,

        /// Seconds between health checks while waiting
        #[arg(long, env = "CADENCE_WAIT_INTERVAL", default_value_t = 5)]
        interval: u64,
    },

    /// Evaluate upgrade preconditions against the cluster
    Preconditions {
        /// Version currently running
        #[arg(long)]
        current: String,

        /// Version being updated to
        #[arg(long)]
        target: String,

        /// Report failures without blocking
        #[arg(long, env = "CADENCE_FORCE")]
        force: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    let result = match cli.command {
        Commands::Apply {
            files,
            mode,
            wait,
            timeout,
            interval,
        } => {
            commands::apply::run(
                &files,
                mode,
                commands::apply::WaitOptions {
                    enabled: wait,
                    timeout_secs: timeout,
                    interval_secs: interval,
                },
                &cancel,
            )
            .await
        }

        Commands::Preconditions {
            current,
            target,
            force,
            json,
        } => commands::preconditions::run(&current, &target, force, json, &cancel).await,
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
