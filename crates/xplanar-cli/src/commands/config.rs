use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use xplanar_core::pipeline::XPlanarConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Take geometry from a Fit2D calibration report
    #[arg(long)]
    pub fit2d: Option<PathBuf>,
}

/// Print or save a default XPlanarConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let mut config = XPlanarConfig::default();

    if let Some(ref report) = args.fit2d {
        let text = std::fs::read_to_string(report)
            .with_context(|| format!("Failed to read Fit2D report {}", report.display()))?;
        let applied = config.geometry.apply_fit2d_report(&text);
        if applied == 0 {
            anyhow::bail!("No refined values found in {}", report.display());
        }
        eprintln!("Applied {applied} value(s) from {}", report.display());
    }
    config.validate().context("Generated config is invalid")?;

    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
