//! CLIP image preprocessing.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array4, ArrayViewMut3};

/// CLIP ViT-B/32 input resolution.
pub const INPUT_SIZE: u32 = 224;

// CLIP normalization constants
const MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Center-crop to a square on the shorter side, then resize to
/// `INPUT_SIZE` x `INPUT_SIZE`.
///
/// Cropping first keeps the intermediate buffer no larger than the source,
/// whatever the aspect ratio.
pub fn resize_and_crop(img: &RgbImage) -> RgbImage {
    let (width, height) = img.dimensions();
    let side = width.min(height);
    if side == 0 {
        return RgbImage::new(INPUT_SIZE, INPUT_SIZE);
    }

    let left = (width - side) / 2;
    let top = (height - side) / 2;
    let square = imageops::crop_imm(img, left, top, side, side).to_image();

    imageops::resize(&square, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
}

/// Write one normalized CHW image into `out` (shape `[3, INPUT_SIZE, INPUT_SIZE]`).
fn write_normalized(img: &RgbImage, mut out: ArrayViewMut3<f32>) {
    for (x, y, pixel) in img.enumerate_pixels() {
        for c in 0..3 {
            // Normalize: (pixel/255 - mean) / std
            out[[c, y as usize, x as usize]] = ((pixel[c] as f32 / 255.0) - MEAN[c]) / STD[c];
        }
    }
}

/// Build the `[N, 3, INPUT_SIZE, INPUT_SIZE]` pixel batch for the vision encoder.
///
/// Every image is cropped to the same square, so the batch needs no further
/// padding.
pub fn pixel_batch<'a, I>(images: I) -> Array4<f32>
where
    I: ExactSizeIterator<Item = &'a RgbImage>,
{
    let side = INPUT_SIZE as usize;
    let mut batch = Array4::<f32>::zeros((images.len(), 3, side, side));

    for (i, img) in images.enumerate() {
        let cropped = resize_and_crop(img);
        write_normalized(&cropped, batch.index_axis_mut(ndarray::Axis(0), i));
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_resize_and_crop_square_output() {
        for (w, h) in [(640, 480), (100, 300), (224, 224), (1, 1), (90, 2)] {
            let img = RgbImage::new(w, h);
            assert_eq!(resize_and_crop(&img).dimensions(), (INPUT_SIZE, INPUT_SIZE), "{}x{}", w, h);
        }
    }

    #[test]
    fn test_extreme_aspect_ratio_stays_small() {
        let tall = RgbImage::from_fn(1, 100_000, |_, y| {
            if y == 50_000 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        });

        let cropped = resize_and_crop(&tall);
        assert_eq!(cropped.dimensions(), (INPUT_SIZE, INPUT_SIZE));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_zero_sized_image() {
        assert_eq!(resize_and_crop(&RgbImage::new(0, 10)).dimensions(), (INPUT_SIZE, INPUT_SIZE));
    }

    #[test]
    fn test_crop_keeps_center() {
        // Wide image: red left third, green middle, blue right third
        let img = RgbImage::from_fn(672, 224, |x, _| match x / 224 {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });

        let cropped = resize_and_crop(&img);
        assert_eq!(cropped.get_pixel(112, 112), &Rgb([0, 255, 0]));
        assert_eq!(cropped.get_pixel(5, 5), &Rgb([0, 255, 0]));
    }

    #[test]
    fn test_pixel_batch_shape_and_normalization() {
        let white = RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]));
        let black = RgbImage::from_pixel(50, 80, Rgb([0, 0, 0]));

        let batch = pixel_batch([&white, &black].into_iter());
        assert_eq!(batch.shape(), &[2, 3, 224, 224]);

        for c in 0..3 {
            let expected_white = (1.0 - MEAN[c]) / STD[c];
            let expected_black = -MEAN[c] / STD[c];
            assert!((batch[[0, c, 10, 10]] - expected_white).abs() < 1e-4);
            assert!((batch[[1, c, 200, 3]] - expected_black).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_batch() {
        let batch = pixel_batch(std::iter::empty::<&RgbImage>());
        assert_eq!(batch.shape(), &[0, 3, 224, 224]);
    }
}
