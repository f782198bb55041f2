//! CLIP model implementation using ONNX Runtime

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::Tensor;
use std::path::Path;

use super::fetch::{ensure_model, ModelFile};
use super::preprocess::{pixel_batch, INPUT_SIZE};
use super::tokenizer::ClipTokenizer;
use crate::config::ModelConfig;
use crate::retrieval::ImageTextScorer;

/// The pretrained model this tool always uses.
pub const MODEL_ID: &str = "openai/clip-vit-base-patch32";

/// CLIP ViT-B/32's learned temperature, exp(4.6052).
pub const LOGIT_SCALE: f32 = 100.0;

// ONNX exports of MODEL_ID
// Source: https://huggingface.co/Qdrant/clip-ViT-B-32-vision
const VISION_MODEL: ModelFile = ModelFile {
    filename: "clip-vit-b32-vision.onnx",
    url: "https://huggingface.co/Qdrant/clip-ViT-B-32-vision/resolve/main/model.onnx",
};

// Source: https://huggingface.co/Qdrant/clip-ViT-B-32-text
const TEXT_MODEL: ModelFile = ModelFile {
    filename: "clip-vit-b32-text.onnx",
    url: "https://huggingface.co/Qdrant/clip-ViT-B-32-text/resolve/main/model.onnx",
};

const TOKENIZER: ModelFile = ModelFile {
    filename: "clip-vit-b32-tokenizer.json",
    url: "https://huggingface.co/Qdrant/clip-ViT-B-32-text/resolve/main/tokenizer.json",
};

/// CLIP vision and text encoders plus the matching tokenizer.
///
/// Loaded fresh for each retrieval; nothing is shared between instances.
pub struct ClipModel {
    vision: Session,
    text: Session,
    tokenizer: ClipTokenizer,
}

impl ClipModel {
    /// Fetch (if needed) and load every component of the model.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        tracing::info!(model = MODEL_ID, "Loading CLIP model...");

        let vision_path = ensure_model(&config.models_dir, &VISION_MODEL, config.offline)?;
        let text_path = ensure_model(&config.models_dir, &TEXT_MODEL, config.offline)?;
        let tokenizer_path = ensure_model(&config.models_dir, &TOKENIZER, config.offline)?;

        let vision = open_session(&vision_path, config.intra_threads)
            .context("Failed to load CLIP visual encoder")?;
        let text = open_session(&text_path, config.intra_threads)
            .context("Failed to load CLIP text encoder")?;
        let tokenizer = ClipTokenizer::from_file(&tokenizer_path)?;

        tracing::debug!(models_dir = ?config.models_dir, "CLIP model ready");
        Ok(Self {
            vision,
            text,
            tokenizer,
        })
    }

    /// Embed all images in one batched pass. Returns `[N, D]`.
    pub fn embed_images(&mut self, images: &[&RgbImage]) -> Result<Array2<f32>> {
        let batch = pixel_batch(images.iter().copied());
        let side = INPUT_SIZE as usize;
        let (pixels, _offset) = batch.into_raw_vec_and_offset();

        let input_tensor = Tensor::from_array((
            [images.len(), 3, side, side],
            pixels.into_boxed_slice(),
        ))?;

        let outputs = self
            .vision
            .run(ort::inputs!["pixel_values" => input_tensor])?;

        extract_embeddings(&outputs, "image_embeds")
    }

    /// Embed a single prompt. Returns a `D`-length vector.
    pub fn embed_text(&mut self, text: &str) -> Result<Array1<f32>> {
        let encoded = self.tokenizer.encode(text)?;
        let seq_len = encoded.input_ids.len();

        let input_ids = Tensor::from_array(([1usize, seq_len], encoded.input_ids.into_boxed_slice()))?;
        let attention_mask =
            Tensor::from_array(([1usize, seq_len], encoded.attention_mask.into_boxed_slice()))?;

        let outputs = self.text.run(ort::inputs![
            "input_ids" => input_ids,
            "attention_mask" => attention_mask
        ])?;

        let embeds = extract_embeddings(&outputs, "text_embeds")?;
        if embeds.nrows() != 1 {
            bail!("Expected one text embedding, got {}", embeds.nrows());
        }
        Ok(embeds.row(0).to_owned())
    }
}

impl ImageTextScorer for ClipModel {
    fn logits_per_image(&mut self, prompt: &str, images: &[&RgbImage]) -> Result<Vec<f32>> {
        let text_embed = self.embed_text(prompt)?;
        let image_embeds = self.embed_images(images)?;

        if image_embeds.ncols() != text_embed.len() {
            bail!(
                "Embedding size mismatch: images {} vs text {}",
                image_embeds.ncols(),
                text_embed.len()
            );
        }

        Ok(logits_per_image(image_embeds.view(), text_embed.view()))
    }
}

fn open_session(path: &Path, intra_threads: usize) -> Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(path)?;
    Ok(session)
}

/// Pull a 2-D embedding matrix out of the session outputs, preferring the
/// named output and falling back to the first one.
fn extract_embeddings(outputs: &SessionOutputs, name: &str) -> Result<Array2<f32>> {
    let (shape, data): (Vec<i64>, Vec<f32>) = match outputs.get(name) {
        Some(value) => {
            let (shape, data) = value.try_extract_tensor::<f32>()?;
            (shape.to_vec(), data.to_vec())
        }
        None => {
            let (_name, value) = outputs
                .iter()
                .next()
                .ok_or_else(|| anyhow!("No embedding output"))?;
            let (shape, data) = value.try_extract_tensor::<f32>()?;
            (shape.to_vec(), data.to_vec())
        }
    };

    // Collapse singleton leading dimensions; the last one is the embedding size
    let width = *shape.last().ok_or_else(|| anyhow!("Embedding output has no dimensions"))? as usize;
    if width == 0 {
        bail!("Embedding output is empty");
    }
    let rows = data.len() / width;

    Array2::from_shape_vec((rows, width), data)
        .map_err(|e| anyhow!("Unexpected embedding shape {:?}: {}", shape, e))
}

/// Scale each vector to unit length; zero vectors are left as is.
pub fn l2_normalize(mut v: Array1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v.mapv_inplace(|x| x / norm);
    }
    v
}

/// Image-to-text logits: `LOGIT_SCALE * cos(image_i, text)` for every row.
pub fn logits_per_image(image_embeds: ArrayView2<f32>, text_embed: ArrayView1<f32>) -> Vec<f32> {
    let text = l2_normalize(text_embed.to_owned());

    image_embeds
        .axis_iter(Axis(0))
        .map(|row| LOGIT_SCALE * l2_normalize(row.to_owned()).dot(&text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(array![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let zero = l2_normalize(array![0.0, 0.0]);
        assert_eq!(zero, array![0.0, 0.0]);
    }

    #[test]
    fn test_logits_per_image() {
        let images = array![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [1.0, 1.0, 0.0]];
        let text = array![5.0, 0.0, 0.0];

        let logits = logits_per_image(images.view(), text.view());

        assert_eq!(logits.len(), 3);
        assert!((logits[0] - 100.0).abs() < 1e-3);
        assert!(logits[1].abs() < 1e-3);
        assert!((logits[2] - 100.0 / 2f32.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_logits_ignore_magnitude() {
        let images = array![[10.0, 0.0], [0.1, 0.0]];
        let text = array![1.0, 0.0];

        let logits = logits_per_image(images.view(), text.view());
        assert!((logits[0] - logits[1]).abs() < 1e-4);
    }
}
