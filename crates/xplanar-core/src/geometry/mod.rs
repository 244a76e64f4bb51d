pub mod crop;
pub mod model;
pub mod params;

pub use crop::Crop;
pub use model::GeometryModel;
pub use params::{GeometryParameter, GeometryParameters};
