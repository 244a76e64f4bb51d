use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binning::Pattern;
use crate::error::Result;

const RECORD_WIDTH: usize = 80;
const MAX_INTENSITY: f64 = 999_999.0;

/// GSAS powder data layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GsasFormat {
    /// Ten intensities per record.
    Std,
    /// Five intensity/uncertainty pairs per record.
    Esd,
    /// One `x y e` triple per record.
    Fxye,
}

impl fmt::Display for GsasFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Std => write!(f, "STD"),
            Self::Esd => write!(f, "ESD"),
            Self::Fxye => write!(f, "FXYE"),
        }
    }
}

/// Render `pattern` as a single-bank GSAS file with CRLF records.
///
/// Intensities are scaled down by a power of ten so the largest fits the
/// fixed-width fields; the scale is written in the title. Patterns without
/// an uncertainty row fall back to `Std`.
pub fn gsas_string(pattern: &Pattern, title: &str, format: GsasFormat) -> String {
    let x = pattern.x();
    let y = pattern.intensity();
    let e = pattern.uncertainty();
    let format = if e.is_none() { GsasFormat::Std } else { format };

    let peak = y.iter().copied().fold(0.0, f64::max);
    let scale = if peak > 0.0 {
        10f64.powi(((MAX_INTENSITY / peak).log10().floor() as i32).min(0))
    } else {
        1.0
    };

    let nchan = y.len();
    let (start, spacing) = if nchan > 1 {
        (x[0] * 100.0, (x[nchan - 1] - x[0]) / (nchan - 1) as f64 * 100.0)
    } else {
        (x.first().copied().unwrap_or(0.0) * 100.0, 0.0)
    };

    let mut lines = Vec::new();
    let mut head = format!("Angular Profile: {title} scale={scale}");
    head.truncate(RECORD_WIDTH);
    lines.push(head);

    let nrec = match format {
        GsasFormat::Std => nchan.div_ceil(10),
        GsasFormat::Esd => nchan.div_ceil(5),
        GsasFormat::Fxye => nchan,
    };
    lines.push(format!(
        "BANK {:5} {:8} {:8} CONST {:9.5} {:9.5} {:9.5} {:9.5} {}",
        1, nchan, nrec, start, spacing, 0.0, 0.0, format
    ));

    match (format, e) {
        (GsasFormat::Esd, Some(e)) => {
            let records: Vec<String> = y
                .iter()
                .zip(e.iter())
                .map(|(&yy, &ee)| format!("{:8.0}{:8.0}", yy * scale, ee * scale))
                .collect();
            lines.extend(records.chunks(5).map(|chunk| chunk.concat()));
        }
        (GsasFormat::Fxye, Some(e)) => {
            lines.extend(
                x.iter()
                    .zip(y.iter())
                    .zip(e.iter())
                    .map(|((&xx, &yy), &ee)| {
                        format!("{:22.10}{:22.10}{:24.10}", xx * 100.0, yy * scale, ee * scale)
                    }),
            );
        }
        _ => {
            let records: Vec<String> = y
                .iter()
                .map(|&yy| format!("{:2}{:6.0}", 1, yy * scale))
                .collect();
            lines.extend(records.chunks(10).map(|chunk| chunk.concat()));
        }
    }

    let mut out = String::new();
    for line in lines {
        out.push_str(&format!("{line:<RECORD_WIDTH$}\r\n"));
    }
    out
}

/// Write `header` followed by the GSAS bank to `path`.
pub fn save_gsas(
    pattern: &Pattern,
    header: &str,
    title: &str,
    format: GsasFormat,
    path: &Path,
) -> Result<()> {
    let mut text = String::new();
    for line in header.lines() {
        text.push_str(&format!("# {line}\n"));
    }
    text.push_str(&gsas_string(pattern, title, format));
    fs::write(path, text)?;
    Ok(())
}
