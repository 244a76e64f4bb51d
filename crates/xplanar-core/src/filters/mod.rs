pub mod rank;
pub mod uniform;

pub use rank::{percentile_filter, rank_filter};
pub use uniform::uniform_filter;
