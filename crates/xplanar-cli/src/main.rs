mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xplanar", about = "Powder diffraction image integration tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Integrate detector images into 1D patterns
    Integrate(commands::integrate::IntegrateArgs),
    /// Refine the beam center, tilt and rotation from a ring image
    Calibrate(commands::calibrate::CalibrateArgs),
    /// Write the effective pixel mask as a PNG
    Mask(commands::mask::MaskArgs),
    /// Generate a default config file
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Integrate(args) => commands::integrate::run(args),
        Commands::Calibrate(args) => commands::calibrate::run(args),
        Commands::Mask(args) => commands::mask::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
