//! CLIP (Contrastive Language-Image Pre-training) scoring module
//!
//! Scores a batch of images against one text prompt:
//! - model files fetched once into a local directory
//! - BPE tokenization of the prompt
//! - batched image preprocessing
//! - image-to-text logits from the ONNX encoders

mod fetch;
mod model;
mod preprocess;
mod tokenizer;

pub use fetch::{ensure_model, ModelFile};
pub use model::{logits_per_image, ClipModel, LOGIT_SCALE, MODEL_ID};
pub use preprocess::{pixel_batch, resize_and_crop, INPUT_SIZE};
pub use tokenizer::{ClipTokenizer, EncodedPrompt, CONTEXT_LENGTH};
