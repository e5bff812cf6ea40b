mod config_commands;
mod dispatch_commands;

use std::path::{Path, PathBuf};

use {
    clap::{Parser, Subcommand},
    courier_config::CourierConfig,
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "courier", about = "Courier — inbound message dispatch")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/courier/).
    #[arg(long, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one message through the dispatch pipeline.
    Dispatch(dispatch_commands::DispatchArgs),
    /// Print the reasoning of the last agent turn in a transcript.
    Reasoning {
        /// Path to a `<session>.jsonl` transcript.
        transcript: PathBuf,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output on stdout stays machine-readable.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the explicit config file, or fall back to discovery.
fn load_config(path: Option<&Path>) -> anyhow::Result<CourierConfig> {
    match path {
        Some(path) => Ok(courier_config::load_config(path)?),
        None => Ok(courier_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    match cli.command {
        Commands::Dispatch(args) => {
            let config = load_config(cli.config.as_deref())?;
            dispatch_commands::handle_dispatch(args, config).await
        },
        Commands::Reasoning { transcript } => {
            match courier_auto_reply::extract_last_reasoning(&transcript).await {
                Some(text) => {
                    println!("{text}");
                    Ok(())
                },
                None => {
                    info!(path = %transcript.display(), "no reasoning found");
                    std::process::exit(1);
                },
            }
        },
        Commands::Config { action } => config_commands::handle_config(action, cli.config),
    }
}
