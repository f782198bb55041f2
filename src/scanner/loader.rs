use anyhow::{Context, Result};
use image::{ImageReader, RgbImage};
use std::path::{Path, PathBuf};

/// A candidate that decoded successfully, kept together with its path.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub image: RgbImage,
}

/// Decode an image file to 8-bit RGB.
///
/// The format is guessed from the file contents so a mislabelled extension
/// still decodes. Animated GIFs yield their first frame.
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Failed to read {}", path.display()))?
        .decode()
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    Ok(img.to_rgb8())
}

/// Decode every candidate, logging and skipping the ones that fail.
pub fn load_images(candidates: &[PathBuf]) -> Vec<LoadedImage> {
    candidates
        .iter()
        .filter_map(|path| match load_rgb(path) {
            Ok(image) => {
                tracing::debug!(path = %path.display(), width = image.width(), height = image.height(), "Loaded image");
                Some(LoadedImage {
                    path: path.clone(),
                    image,
                })
            }
            Err(e) => {
                tracing::warn!("Could not load {}: {:#}", path.display(), e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_images_skips_undecodable() {
        let dir = tempdir().unwrap();

        let good = dir.path().join("good.png");
        RgbImage::from_pixel(8, 6, Rgb([10, 20, 30])).save(&good).unwrap();

        let bad = dir.path().join("bad.jpg");
        fs::write(&bad, b"definitely not a jpeg").unwrap();

        let missing = dir.path().join("missing.png");

        let loaded = load_images(&[bad, good.clone(), missing]);

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path, good);
        assert_eq!(loaded[0].image.dimensions(), (8, 6));
        assert_eq!(loaded[0].image.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_load_rgb_sniffs_format() {
        let dir = tempdir().unwrap();

        // PNG bytes behind a .jpg name
        let png_path = dir.path().join("real.png");
        RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])).save(&png_path).unwrap();
        let mislabelled = dir.path().join("mislabelled.jpg");
        fs::copy(&png_path, &mislabelled).unwrap();

        let img = load_rgb(&mislabelled).unwrap();
        assert_eq!(img.get_pixel(2, 2), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_load_rgb_converts_to_three_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(3, 3, image::Luma([128])).save(&path).unwrap();

        let img = load_rgb(&path).unwrap();
        assert_eq!(img.get_pixel(1, 1), &Rgb([128, 128, 128]));
    }

    #[test]
    fn test_directory_named_like_image_fails() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("folder.jpg");
        fs::create_dir(&sub).unwrap();

        assert!(load_rgb(&sub).is_err());
        assert!(load_images(&[sub]).is_empty());
    }
}
