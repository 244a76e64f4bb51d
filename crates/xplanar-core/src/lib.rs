pub mod binning;
pub mod calibrate;
pub mod consts;
pub mod correction;
pub mod error;
pub mod filters;
pub mod frame;
pub mod geometry;
pub mod io;
pub mod mask;
pub mod pipeline;
