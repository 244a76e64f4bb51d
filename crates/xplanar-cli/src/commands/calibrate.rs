use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use xplanar_core::calibrate::{
    CalibrationConfig, CalibrationMode, CalibrationResult, Calibrator, ObjectiveMode,
};
use xplanar_core::io::ImageLoader;

use super::{build_integrator, load_config};
use crate::summary::print_calibration_result;

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    X,
    Y,
    Tilt,
    Rotation,
    All,
    /// x, y, tilt and rotation one after another
    Sequential,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ObjectiveArg {
    Scalar,
    Vector,
}

#[derive(Args)]
pub struct CalibrateArgs {
    /// Image of a standard with complete rings
    pub file: PathBuf,

    /// Config file (TOML) holding the starting geometry
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Parameters to refine
    #[arg(long, value_enum, default_value = "x")]
    pub mode: ModeArg,

    /// Objective handed to the optimizer
    #[arg(long, value_enum, default_value = "scalar")]
    pub objective: ObjectiveArg,

    /// Search half-width around the starting beam center, in pixels
    #[arg(long, default_value = "3.0")]
    pub center_bound: f64,

    /// Tilt search half-width around the starting tilt, in degrees
    #[arg(long, default_value = "5.0")]
    pub tilt_bound: f64,

    /// Keep dark and bright pixel detection on while calibrating
    #[arg(long)]
    pub keep_dynamic_masks: bool,

    /// Save the refined configuration to this TOML file
    #[arg(long)]
    pub write: Option<PathBuf>,
}

pub fn run(args: &CalibrateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let loader = ImageLoader::new(&config.input);
    let frame = loader.load(&args.file)?;
    let mut integrator = build_integrator(config)?;

    let calibration = CalibrationConfig {
        mode: match args.mode {
            ModeArg::X | ModeArg::Sequential => CalibrationMode::X,
            ModeArg::Y => CalibrationMode::Y,
            ModeArg::Tilt => CalibrationMode::Tilt,
            ModeArg::Rotation => CalibrationMode::Rotation,
            ModeArg::All => CalibrationMode::All,
        },
        objective: match args.objective {
            ObjectiveArg::Scalar => ObjectiveMode::Scalar,
            ObjectiveArg::Vector => ObjectiveMode::Vector,
        },
        center_bound: args.center_bound,
        tilt_bound_deg: args.tilt_bound,
        keep_dynamic_masks: args.keep_dynamic_masks,
        ..CalibrationConfig::default()
    };

    let results: Vec<CalibrationResult> = {
        let mut calibrator = Calibrator::new(&mut integrator, calibration);
        if matches!(args.mode, ModeArg::Sequential) {
            calibrator.calibrate_sequential(&frame)?
        } else {
            vec![calibrator.calibrate(&frame)?]
        }
    };
    for result in &results {
        print_calibration_result(result);
    }

    let toml_str = toml::to_string_pretty(integrator.config())?;
    if let Some(ref path) = args.write {
        std::fs::write(path, toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Refined config saved to {}", path.display());
    } else {
        println!();
        print!("{}", toml_str);
    }

    Ok(())
}
