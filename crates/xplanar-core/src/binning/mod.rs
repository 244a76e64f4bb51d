pub mod engine;
pub mod grid;
pub mod index;
pub mod pattern;
pub mod variance;

pub use engine::{BinningEngine, BinningOptions};
pub use grid::{BinGrid, IntegrationSpace};
pub use index::BinIndex;
pub use pattern::Pattern;
pub use variance::local_variance;
