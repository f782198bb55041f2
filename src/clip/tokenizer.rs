use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};

/// CLIP's text context length.
pub const CONTEXT_LENGTH: usize = 77;

/// Token ids and attention mask for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPrompt {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
}

/// BPE tokenizer loaded from the CLIP `tokenizer.json`.
pub struct ClipTokenizer {
    inner: Tokenizer,
}

impl ClipTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer {}: {}", path.display(), e))?;

        inner
            .with_truncation(Some(TruncationParams {
                max_length: CONTEXT_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure tokenizer: {}", e))?;

        Ok(Self { inner })
    }

    pub fn encode(&self, text: &str) -> Result<EncodedPrompt> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow!("Failed to tokenize prompt: {}", e))?;

        Ok(EncodedPrompt {
            input_ids: encoding.get_ids().iter().map(|&id| id as i64).collect(),
            attention_mask: encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect(),
        })
    }
}
