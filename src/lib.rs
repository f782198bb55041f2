//! Find the image in a folder that best matches a text prompt.
//!
//! The folder is listed (non-recursively), files with a recognized image
//! extension are decoded, and CLIP ViT-B/32 scores every image against the
//! prompt in one batch. The highest image-to-text logit wins.

pub mod clip;
pub mod config;
pub mod error;
pub mod logging;
pub mod retrieval;
pub mod scanner;

pub use config::Config;
pub use error::RetrievalError;
pub use retrieval::{argmax, result_line, retrieve, retrieve_best_image, ImageTextScorer, Match};
