//! Text-to-image retrieval over a single folder.

use anyhow::Result;
use image::RgbImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::clip::ClipModel;
use crate::config::Config;
use crate::error::RetrievalError;
use crate::scanner::{discover_candidates, load_images};

/// Anything that can score a batch of images against one prompt.
pub trait ImageTextScorer {
    /// One image-to-text logit per image, in input order.
    fn logits_per_image(&mut self, prompt: &str, images: &[&RgbImage]) -> Result<Vec<f32>>;
}

/// The winning image and its logit.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub path: PathBuf,
    pub score: f32,
}

/// Path of the image in `folder` that best matches `prompt`, using the CLIP
/// model described by `config`. Every failure is logged and yields `None`.
pub fn retrieve_best_image(folder: &Path, prompt: &str, config: &Config) -> Option<PathBuf> {
    let result = retrieve(folder, prompt, &config.scanner.image_extensions, || {
        ClipModel::load(&config.model)
    });

    match result {
        Ok(found) => Some(found.path),
        Err(e) => {
            match &e {
                RetrievalError::Model(inner) => {
                    error!(kind = e.kind(), "Error during image retrieval: {:?}", inner)
                }
                _ => warn!(kind = e.kind(), "No match: {}", e),
            }
            None
        }
    }
}

/// Run a retrieval with an injectable model.
///
/// `load_model` is only called once at least one candidate has decoded.
/// Loading and scoring run inside one boundary that turns errors and panics
/// into [`RetrievalError::Model`] / [`RetrievalError::ModelPanicked`].
pub fn retrieve<S, F>(
    folder: &Path,
    prompt: &str,
    extensions: &[String],
    load_model: F,
) -> Result<Match, RetrievalError>
where
    S: ImageTextScorer,
    F: FnOnce() -> Result<S>,
{
    info!("Starting image retrieval for prompt: '{}'", prompt);
    info!("Looking in folder: {}", folder.display());

    if !folder.exists() {
        error!("Folder '{}' does not exist", folder.display());
        return Err(RetrievalError::FolderNotFound(folder.to_path_buf()));
    }

    let discovery = discover_candidates(folder, extensions)?;
    info!("Found {} files in folder", discovery.entries);
    info!(
        "Found {} images with valid extensions",
        discovery.candidates.len()
    );

    if discovery.candidates.is_empty() {
        return Err(RetrievalError::NoCandidates);
    }

    let loaded = load_images(&discovery.candidates);
    info!("Successfully loaded {} images", loaded.len());

    if loaded.is_empty() {
        return Err(RetrievalError::NoDecodableImages(discovery.candidates.len()));
    }

    let scores = panic::catch_unwind(AssertUnwindSafe(|| -> Result<Vec<f32>> {
        let mut model = load_model()?;

        info!("Processing images with CLIP...");
        let images: Vec<&RgbImage> = loaded.iter().map(|l| &l.image).collect();
        let scores = model.logits_per_image(prompt, &images)?;

        if scores.len() != images.len() {
            anyhow::bail!(
                "Model returned {} scores for {} images",
                scores.len(),
                images.len()
            );
        }
        Ok(scores)
    }))
    .map_err(|payload| RetrievalError::ModelPanicked(panic_message(payload.as_ref())))?
    .map_err(RetrievalError::Model)?;

    // Non-empty and equal in length to `loaded`, checked above
    let best = argmax(&scores).unwrap_or(0);
    let found = Match {
        path: loaded[best].path.clone(),
        score: scores[best],
    };

    info!("Best match score: {}", found.score);
    info!("Best match path: {}", found.path.display());

    Ok(found)
}

/// The single stdout line for a retrieval: the path, or empty, always
/// newline-terminated.
pub fn result_line(best: Option<&Path>) -> String {
    let mut line = best
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_default();
    line.push('\n');
    line
}

/// Index of the largest score, first occurrence on ties. NaN never wins
/// against a number. `None` for an empty slice.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<usize> = None;

    for (i, &score) in scores.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(b) => {
                let current = scores[b];
                if score > current || (current.is_nan() && !score.is_nan()) {
                    best = Some(i);
                }
            }
        }
    }

    best
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
