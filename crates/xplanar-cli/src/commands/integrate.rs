use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use xplanar_core::binning::{IntegrationSpace, Pattern};
use xplanar_core::frame::Frame;
use xplanar_core::io::chi::config_header;
use xplanar_core::io::{save_chi, save_gsas, GsasFormat, ImageLoader};
use xplanar_core::pipeline::{Integrator, OutputConfig, XPlanarConfig};

use super::{build_integrator, load_config};
use crate::summary::print_integration_summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum SpaceArg {
    #[value(name = "tth")]
    TwoTheta,
    Q,
}

impl From<SpaceArg> for IntegrationSpace {
    fn from(arg: SpaceArg) -> Self {
        match arg {
            SpaceArg::TwoTheta => IntegrationSpace::TwoTheta,
            SpaceArg::Q => IntegrationSpace::Q,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GsasArg {
    Std,
    Esd,
    Fxye,
}

impl From<GsasArg> for GsasFormat {
    fn from(arg: GsasArg) -> Self {
        match arg {
            GsasArg::Std => GsasFormat::Std,
            GsasArg::Esd => GsasFormat::Esd,
            GsasArg::Fxye => GsasFormat::Fxye,
        }
    }
}

#[derive(Args)]
pub struct IntegrateArgs {
    /// Detector images
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Integrate the sum of all images into a single pattern
    #[arg(long)]
    pub sum: bool,

    /// Integration axis, overriding the config
    #[arg(long, value_enum)]
    pub space: Option<SpaceArg>,

    /// Also write a GSAS file in this layout
    #[arg(long, value_enum)]
    pub gsas: Option<GsasArg>,

    /// Raise the upper limit to cover the detector corners
    #[arg(long)]
    pub full_range: bool,

    /// Emit the per-bin uncertainty column
    #[arg(long)]
    pub uncertainty: bool,

    /// Directory for output files (defaults to next to each image)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

pub fn run(args: &IntegrateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);

    if args.full_range {
        let report = config.resolve_range();
        if report.extended {
            eprintln!(
                "Upper limit raised to {:.4} to cover the detector",
                config.integration.max()
            );
        }
    }

    print_integration_summary(&config, args.files.len());

    let loader = ImageLoader::new(&config.input);
    let mut integrator = build_integrator(config.clone())?;

    let pb = ProgressBar::new(args.files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let header = config_header(&config);

    if args.sum {
        pb.set_message("Loading");
        let mut frames = Vec::with_capacity(args.files.len());
        for path in &args.files {
            frames.push(loader.load(path)?);
            pb.inc(1);
        }
        if let Some(first) = frames.first() {
            bootstrap(&mut integrator, first)?;
        }
        pb.set_message("Integrating");
        let pattern = integrator.integrate_sum(&frames)?;
        pb.finish_with_message("Done");

        write_outputs(&pattern, &header, &sum_name(&args.files[0]), &config.output)?;
        return Ok(());
    }

    let failed = integrate_each(
        &args.files,
        &loader,
        &mut integrator,
        &header,
        &config.output,
        &pb,
    );
    pb.finish_with_message("Done");

    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) failed", args.files.len());
    }
    Ok(())
}

/// Integrate and write each file on its own. A file that fails is reported
/// and counted; the rest of the batch still runs. Returns the failure count.
fn integrate_each(
    files: &[PathBuf],
    loader: &ImageLoader,
    integrator: &mut Integrator,
    header: &str,
    output: &OutputConfig,
    pb: &ProgressBar,
) -> usize {
    let mut bootstrapped = false;
    let mut failed = 0;

    for path in files {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let result = integrate_one(path, loader, integrator, &mut bootstrapped, header, output);
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Skipping file");
            pb.println(format!("{}: {e:#}", path.display()));
            failed += 1;
        }
        pb.inc(1);
    }
    failed
}

fn integrate_one(
    path: &Path,
    loader: &ImageLoader,
    integrator: &mut Integrator,
    bootstrapped: &mut bool,
    header: &str,
    output: &OutputConfig,
) -> Result<()> {
    let frame = loader.load(path)?;
    if !*bootstrapped {
        bootstrap(integrator, &frame)?;
        *bootstrapped = true;
    }
    let pattern = integrator
        .integrate(&frame)
        .with_context(|| format!("Failed to integrate {}", path.display()))?;
    write_outputs(&pattern, header, path, output)
}

fn apply_overrides(config: &mut XPlanarConfig, args: &IntegrateArgs) {
    if let Some(space) = args.space {
        config.integration.space = space.into();
    }
    if let Some(gsas) = args.gsas {
        config.output.gsas = Some(gsas.into());
    }
    if args.uncertainty {
        config.integration.uncertainty = true;
    }
    if let Some(ref dir) = args.output_dir {
        config.output.directory = Some(dir.clone());
    }
}

/// Estimate the auto-mask from the first frame of the run.
fn bootstrap(integrator: &mut Integrator, frame: &Frame) -> Result<()> {
    let excluded = integrator.bootstrap_auto_mask(frame)?;
    if excluded > 0 {
        eprintln!("Auto-mask excludes {excluded} pixel(s)");
    }
    Ok(())
}

fn sum_name(first: &Path) -> PathBuf {
    let stem = first
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pattern".to_string());
    first.with_file_name(format!("{stem}_sum"))
}

/// `<dir>/<stem><suffix>.<extension>`, with `dir` defaulting to the input's directory.
fn output_path(input: &Path, output: &OutputConfig, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pattern".to_string());
    let dir = output
        .directory
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}{}.{extension}", output.suffix))
}

fn write_outputs(
    pattern: &Pattern,
    header: &str,
    input: &Path,
    output: &OutputConfig,
) -> Result<()> {
    let chi = output_path(input, output, "chi");
    save_chi(pattern, header, &chi)
        .with_context(|| format!("Failed to write {}", chi.display()))?;
    info!(path = %chi.display(), bins = pattern.len(), "Pattern written");

    if let Some(format) = output.gsas {
        let gsas = output_path(input, output, "gsas");
        let title = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        save_gsas(pattern, header, &title, format, &gsas)
            .with_context(|| format!("Failed to write {}", gsas.display()))?;
    }
    Ok(())
}
