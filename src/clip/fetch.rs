//! Model file resolution and download.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};

/// A model artifact stored under a fixed local name.
#[derive(Debug, Clone, Copy)]
pub struct ModelFile {
    pub filename: &'static str,
    pub url: &'static str,
}

/// Return the local path of `file`, downloading it into `models_dir` first
/// if it is missing. With `offline` set a missing file is an error.
pub fn ensure_model(models_dir: &Path, file: &ModelFile, offline: bool) -> Result<PathBuf> {
    let model_path = models_dir.join(file.filename);

    if model_path.exists() {
        return Ok(model_path);
    }

    if offline {
        bail!(
            "Model file {} is missing and downloads are disabled",
            model_path.display()
        );
    }

    std::fs::create_dir_all(models_dir)
        .with_context(|| format!("Failed to create {}", models_dir.display()))?;

    tracing::info!(model = %file.filename, "Downloading model...");
    let response = ureq::get(file.url)
        .call()
        .map_err(|e| anyhow!("Failed to download model: {}", e))?;

    // Written beside the target and renamed, so an interrupted download
    // never leaves a truncated model under the final name
    let part_path = models_dir.join(format!("{}.part", file.filename));
    let mut part = std::fs::File::create(&part_path)?;
    if let Err(e) = std::io::copy(&mut response.into_reader(), &mut part) {
        let _ = std::fs::remove_file(&part_path);
        return Err(e).context("Failed to write model download");
    }
    drop(part);

    std::fs::rename(&part_path, &model_path)?;
    tracing::info!(model = %file.filename, path = ?model_path, "Model downloaded");

    Ok(model_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FILE: ModelFile = ModelFile {
        filename: "model.onnx",
        url: "http://127.0.0.1:9/model.onnx",
    };

    #[test]
    fn test_existing_file_is_used_without_download() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"weights").unwrap();

        let path = ensure_model(dir.path(), &FILE, true).unwrap();
        assert_eq!(path, dir.path().join("model.onnx"));
    }

    #[test]
    fn test_offline_missing_file_fails() {
        let dir = tempdir().unwrap();

        let err = ensure_model(dir.path(), &FILE, true).unwrap_err();
        assert!(err.to_string().contains("downloads are disabled"));
        assert!(!dir.path().join("model.onnx").exists());
    }

    #[test]
    fn test_failed_download_leaves_no_file() {
        let dir = tempdir().unwrap();

        assert!(ensure_model(dir.path(), &FILE, false).is_err());
        assert!(!dir.path().join("model.onnx").exists());
        assert!(!dir.path().join("model.onnx.part").exists());
    }
}
