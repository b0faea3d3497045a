use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use omnibot_link::config::LinkConfig;
use omnibot_link::runtime;

/// Console <-> robot property link for the 3-wheel omni base
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON config file (every field optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Topic the console publishes on (overrides config)
    #[arg(long, global = true)]
    console_topic: Option<String>,

    /// Topic the robot publishes on (overrides config)
    #[arg(long, global = true)]
    robot_topic: Option<String>,

    #[command(subcommand)]
    role: RoleCmd,
}

#[derive(Debug, Subcommand)]
enum RoleCmd {
    /// Keyboard operator console
    Console,
    /// Simulated robot base
    Robot,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match LinkConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error ({}): {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => LinkConfig::default(),
    };
    if let Some(topic) = cli.console_topic {
        config.topics.console = topic;
    }
    if let Some(topic) = cli.robot_topic {
        config.topics.robot = topic;
    }

    let result = match cli.role {
        RoleCmd::Console => runtime::run_console(config).await,
        RoleCmd::Robot => runtime::run_robot(config).await,
    };
    if let Err(e) = result {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
