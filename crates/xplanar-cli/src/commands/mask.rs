use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use xplanar_core::io::{save_mask_png, ImageLoader};

use super::{build_integrator, load_config};

#[derive(Args)]
pub struct MaskArgs {
    /// Image used for the auto-mask and the dark/bright pixel masks
    pub file: Option<PathBuf>,

    /// Config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "mask.png")]
    pub output: PathBuf,
}

/// Save the mask an integration would apply, cropped like the integration window.
pub fn run(args: &MaskArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let loader = ImageLoader::new(&config.input);
    let mut integrator = build_integrator(config)?;

    let frame = match args.file {
        Some(ref path) => Some(loader.load(path)?),
        None => None,
    };
    if let Some(ref frame) = frame {
        integrator.bootstrap_auto_mask(frame)?;
    }

    let mask = integrator.composed_mask(frame.as_ref())?;
    save_mask_png(&mask, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let excluded = mask.iter().filter(|&&m| m).count();
    println!(
        "{excluded} of {} pixels excluded, saved to {}",
        mask.len(),
        args.output.display()
    );
    Ok(())
}
