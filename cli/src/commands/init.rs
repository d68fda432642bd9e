//! Init Command - Write a configuration file

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::{default_config_path, BackendKind, CloakConfig};

/// Write a configuration file
#[derive(Args)]
pub struct InitCommand {
    /// Ciphertext backend (clear, tfhe)
    #[arg(short, long, default_value = "clear")]
    backend: BackendKind,

    /// Track liquidity on both pool sides
    #[arg(long)]
    symmetric: bool,

    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub fn execute(self, config_path: Option<PathBuf>) -> anyhow::Result<()> {
        let config_path = config_path.unwrap_or_else(default_config_path);

        info!("Initializing CLOAK configuration for the {} backend", self.backend);

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        let mut config = CloakConfig::for_backend(self.backend);
        if self.symmetric {
            config.hook.tracking = cloak_defi::TrackingMode::Symmetric;
        }
        config.save(&config_path)?;

        info!("Configuration saved to {}", config_path.display());

        println!();
        println!("CLOAK configuration written to {}", config_path.display());
        println!("  hook address: {}", config.hook.address);
        println!("  backend:      {}", config.coprocessor.backend);
        println!();
        println!("To run a scenario:");
        println!("  cloak --config {} simulate <scenario.toml>", config_path.display());

        Ok(())
    }
}
