use console::Style;
use xplanar_core::calibrate::CalibrationResult;
use xplanar_core::pipeline::XPlanarConfig;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
        }
    }
}

fn on_off(s: &Styles, enabled: bool) -> String {
    if enabled {
        s.method.apply_to("on").to_string()
    } else {
        s.disabled.apply_to("off").to_string()
    }
}

pub fn print_integration_summary(config: &XPlanarConfig, files: usize) {
    let s = Styles::new();
    let g = &config.geometry;
    let i = &config.integration;
    let c = &config.correction;

    println!();
    println!("  {}", s.title.apply_to("XPlanar Integration"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(19)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Images"),
        s.value.apply_to(files)
    );
    println!();

    println!("  {}", s.header.apply_to("Geometry"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Center"),
        s.value
            .apply_to(format!("{:.2}, {:.2} px", g.x_beam_center, g.y_beam_center))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Distance"),
        s.value.apply_to(g.distance)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Tilt"),
        s.value.apply_to(format!(
            "{:.3} deg, rotation {:.2} deg",
            g.tilt.to_degrees(),
            g.rotation.to_degrees()
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Detector"),
        s.value.apply_to(format!("{}x{}", g.x_dimension, g.y_dimension))
    );
    println!();

    println!("  {}", s.header.apply_to("Binning"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Space"),
        s.method.apply_to(i.space)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Step"),
        s.value.apply_to(format!("{} up to {}", i.step(), i.max()))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Outliers"),
        on_off(&s, i.self_correction)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Uncertainty"),
        on_off(&s, i.uncertainty)
    );
    println!();

    println!("  {}", s.header.apply_to("Corrections"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Solid angle"),
        on_off(&s, c.solid_angle)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Polarize"),
        on_off(&s, c.polarization)
    );
    println!();
}

pub fn print_calibration_result(result: &CalibrationResult) {
    let s = Styles::new();
    let (a, b) = (&result.initial, &result.refined);

    println!();
    println!(
        "  {} {}",
        s.header.apply_to("Calibration"),
        s.method.apply_to(result.mode)
    );
    println!(
        "    {:<12}{:.3} -> {}",
        s.label.apply_to("X center"),
        a.x_beam_center,
        s.value.apply_to(format!("{:.3}", b.x_beam_center))
    );
    println!(
        "    {:<12}{:.3} -> {}",
        s.label.apply_to("Y center"),
        a.y_beam_center,
        s.value.apply_to(format!("{:.3}", b.y_beam_center))
    );
    println!(
        "    {:<12}{:.4} -> {}",
        s.label.apply_to("Tilt"),
        a.tilt.to_degrees(),
        s.value.apply_to(format!("{:.4} deg", b.tilt.to_degrees()))
    );
    println!(
        "    {:<12}{:.3} -> {}",
        s.label.apply_to("Rotation"),
        a.rotation.to_degrees(),
        s.value.apply_to(format!("{:.3} deg", b.rotation.to_degrees()))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Objective"),
        s.value.apply_to(format!("{:.6e} ({} evaluations)", result.objective, result.evaluations))
    );
}
