//! CLOAK CLI
//!
//! Command-line interface for configuring and exercising the confidential
//! liquidity hook.
//!
//! # Usage
//!
//! ```bash
//! # Write a default configuration (clear backend)
//! cloak init
//!
//! # Write a TFHE configuration to a specific path
//! cloak --config ./cloak.toml init --backend tfhe
//!
//! # Run a scenario against a fresh runtime
//! cloak simulate scenarios/basic.toml
//!
//! # Emit results as JSON lines
//! cloak --json-logs simulate scenarios/basic.toml --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use commands::{InitCommand, SimulateCommand};
use config::CloakConfig;

/// CLOAK Confidential Liquidity Hook
#[derive(Parser)]
#[command(name = "cloak")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Confidential liquidity accumulator with owner-gated disclosure", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "CLOAK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file
    Init(InitCommand),

    /// Run a scripted scenario
    Simulate(SimulateCommand),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `init` writes the config, so it must not require one to exist
    let mut config = match cli.command {
        Commands::Init(_) => CloakConfig::default(),
        _ => CloakConfig::load_or_default(cli.config.as_deref())?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json_logs {
        config.logging.format = "json".to_string();
    }

    logging::init(&config.logging)?;

    match cli.command {
        Commands::Init(cmd) => cmd.execute(cli.config),
        Commands::Simulate(cmd) => cmd.execute(config).await,
        Commands::Version => {
            println!("cloak {}", cloak::VERSION);
            println!("Backends: clear{}", if cfg!(feature = "tfhe") { ", tfhe" } else { "" });
            Ok(())
        }
    }
}
