pub mod config;
mod integrator;

pub use config::{InputConfig, IntegrationConfig, OutputConfig, RangeReport, XPlanarConfig};
pub use integrator::Integrator;
