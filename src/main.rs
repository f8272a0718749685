use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use diffbot_runtime::config::RobotConfig;
use diffbot_runtime::messages::MoveCommand;
use diffbot_runtime::runtime::{self, RunOptions};

/// Two-wheel robot runtime on simulated hardware
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file; defaults are used for anything it leaves out
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Commands to queue, e.g. "forward,left,0x02"
    #[arg(short, long, value_delimiter = ',')]
    program: Vec<MoveCommand>,

    /// Run the program immediately instead of waiting for the button
    #[arg(long)]
    auto_start: bool,

    /// Print a JSON status line every tick
    #[arg(long)]
    json: bool,

    /// Exit once the program has run to completion
    #[arg(long)]
    exit_when_done: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr) // keep stdout for --json
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match RobotConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("No config file given, using defaults");
            RobotConfig::default()
        }
    };

    let options = RunOptions {
        program: args.program,
        auto_start: args.auto_start,
        json: args.json,
        exit_when_done: args.exit_when_done,
    };

    if let Err(e) = runtime::run(config, options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
