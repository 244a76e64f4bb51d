pub mod chi;
pub mod gsas;
pub mod image_io;
pub mod mask_io;

pub use chi::{save_chi, write_chi};
pub use gsas::{gsas_string, save_gsas, GsasFormat};
pub use image_io::{load_raw, ImageLoader, RetryPolicy};
pub use mask_io::{load_mask, load_masks, save_mask_png};
