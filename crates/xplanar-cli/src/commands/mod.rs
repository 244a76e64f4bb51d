pub mod calibrate;
pub mod config;
pub mod integrate;
pub mod mask;

use std::path::Path;

use anyhow::{Context, Result};
use xplanar_core::io::load_masks;
use xplanar_core::pipeline::{Integrator, XPlanarConfig};

/// Read a TOML config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<XPlanarConfig> {
    let Some(path) = path else {
        return Ok(XPlanarConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
}

/// Integrator for `config` with its mask files attached.
pub fn build_integrator(config: XPlanarConfig) -> Result<Integrator> {
    let masks = load_masks(&config.mask.files, &config.input)
        .context("Failed to load mask files")?;
    let integrator = Integrator::new(config).context("Invalid configuration")?;
    Ok(integrator.with_imported_masks(masks))
}
