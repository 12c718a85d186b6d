use std::path::PathBuf;

use clap::Parser;

/// Command-line configuration. Each path can also come from the environment.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "rent-scope", version, about = "Explore rental listings and simulate prices")]
pub struct Config {
    /// Listings dataset (.csv, .json or .parquet) to open at startup.
    #[arg(long, env = "RENT_SCOPE_DATA")]
    pub data: Option<PathBuf>,

    /// Fitted-model coefficient CSV (`Variables,Coeficientes`).
    #[arg(long, env = "RENT_SCOPE_COEFFICIENTS")]
    pub coefficients: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG still takes precedence).
    #[arg(long)]
    pub debug: bool,
}

impl Config {
    /// Default log filter when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
