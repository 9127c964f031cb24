use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::error::PassPhotoError;
use crate::jfif;

/// Output side length in pixels. 600px at 300 DPI prints at 2x2 inches.
pub(crate) const OUTPUT_SIZE: u32 = 600;

/// Print density stamped into the JPEG, dots per inch.
pub(crate) const OUTPUT_DPI: u16 = 300;

/// Fixed brightness multiplier applied after resizing.
const BRIGHTNESS_FACTOR: f32 = 1.05;

/// Fixed contrast multiplier applied about the mean luma.
const CONTRAST_FACTOR: f32 = 1.1;

/// JPEG quality of the final encode.
const JPEG_QUALITY: u8 = 95;

/// Resample a crop to the output size, enhance it, and encode the final
/// JPEG with its print density stamped.
pub(crate) fn render_jpeg(crop: &RgbImage) -> Result<Vec<u8>, PassPhotoError> {
    let resized = imageops::resize(crop, OUTPUT_SIZE, OUTPUT_SIZE, FilterType::Lanczos3);
    let enhanced = enhance(&resized);

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder
        .write_image(
            enhanced.as_raw(),
            OUTPUT_SIZE,
            OUTPUT_SIZE,
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| PassPhotoError::Encode(e.to_string()))?;

    Ok(jfif::stamp_density(&buffer, OUTPUT_DPI))
}

/// Brightness then contrast. Contrast scales each channel's deviation from
/// the mean luma of the brightened image, so midtones stay put while the
/// spread widens.
fn enhance(image: &RgbImage) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for value in pixel.0.iter_mut() {
            *value = (*value as f32 * BRIGHTNESS_FACTOR).round().clamp(0.0, 255.0) as u8;
        }
    }

    let mean = mean_luma(&out);
    for pixel in out.pixels_mut() {
        for value in pixel.0.iter_mut() {
            let contrasted: f32 = mean + (*value as f32 - mean) * CONTRAST_FACTOR;
            *value = contrasted.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Rec. 601 luma average, the reference gray for the contrast step.
fn mean_luma(image: &RgbImage) -> f32 {
    let mut sum = 0.0f64;
    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        sum += 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    }
    (sum / (image.width() as f64 * image.height() as f64)) as f32
}
