//! Candidate discovery and decoding.

mod discovery;
mod loader;

pub use discovery::{discover_candidates, Discovery};
pub use loader::{load_images, load_rgb, LoadedImage};
