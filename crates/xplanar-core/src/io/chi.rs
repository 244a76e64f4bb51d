use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::binning::Pattern;
use crate::error::Result;
use crate::pipeline::XPlanarConfig;

/// Free-form description of the setup that produced a pattern, one
/// `key: value` per line.
pub fn config_header(config: &XPlanarConfig) -> String {
    let g = &config.geometry;
    let i = &config.integration;
    let c = &config.correction;
    let lines = [
        "Pattern generated by xplanar".to_string(),
        "--------------------------------------".to_string(),
        format!("x_beam_center: {}", g.x_beam_center),
        format!("y_beam_center: {}", g.y_beam_center),
        format!("distance: {}", g.distance),
        format!("rotation_deg: {}", g.rotation.to_degrees()),
        format!("tilt_deg: {}", g.tilt.to_degrees()),
        format!("wavelength: {}", g.wavelength),
        format!("x_pixel_size: {}", g.x_pixel_size),
        format!("y_pixel_size: {}", g.y_pixel_size),
        format!("space: {}", i.space),
        format!("step: {}", i.step()),
        format!("max: {}", i.max()),
        format!("solid_angle: {}", c.solid_angle),
        format!("polarization: {}", c.polarization),
        "--------------------------------------".to_string(),
    ];
    lines.join("\n")
}

/// Write `header` as `# `-prefixed lines, then one `x intensity [uncertainty]`
/// line per bin.
pub fn write_chi<W: Write>(out: &mut W, pattern: &Pattern, header: &str) -> Result<()> {
    for line in header.lines() {
        writeln!(out, "# {line}")?;
    }
    let data = pattern.data();
    for column in data.columns() {
        let fields: Vec<String> = column.iter().map(|&v| general(v)).collect();
        writeln!(out, "{}", fields.join(" "))?;
    }
    Ok(())
}

pub fn save_chi(pattern: &Pattern, header: &str, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_chi(&mut out, pattern, header)?;
    out.flush()?;
    Ok(())
}

/// Six significant digits, fixed or scientific by magnitude, without
/// trailing zeros.
fn general(v: f64) -> String {
    if v == 0.0 || !v.is_finite() {
        return format!("{v}");
    }
    let exp = v.abs().log10().floor() as i32;
    if (-5..6).contains(&exp) {
        let decimals = (5 - exp).max(0) as usize;
        let fixed = format!("{v:.decimals$}");
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            fixed
        }
    } else {
        format!("{v:.5e}")
    }
}

#[cfg(test)]
mod tests {
    use super::general;

    #[test]
    fn general_format_trims() {
        assert_eq!(general(0.0), "0");
        assert_eq!(general(100.0), "100");
        assert_eq!(general(0.04), "0.04");
        assert_eq!(general(1.2345678), "1.23457");
        assert_eq!(general(-2.5), "-2.5");
    }
}
