//! Image loading and fixed photometric enhancement ahead of detection.

use image::{ImageError, ImageReader, RgbImage};
use std::path::Path;

const CONTRAST_FACTOR: f32 = 1.2;
const BRIGHTNESS_FACTOR: f32 = 1.1;

/// Decode `path`, normalize it to RGB8 and apply contrast then brightness enhancement.
///
/// Returns `None` on any failure; callers fall back to [`load_raw`].
pub fn preprocess(path: &Path) -> Option<RgbImage> {
    match image::open(path) {
        Ok(decoded) => Some(enhance(decoded.to_rgb8())),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "preprocessing failed, using raw image");
            None
        }
    }
}

/// Load `path` without enhancement, sniffing the format from the file contents
/// rather than trusting the extension.
pub fn load_raw(path: &Path) -> Result<RgbImage, ImageError> {
    let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(decoded.to_rgb8())
}

/// Apply the fixed contrast and brightness enhancement, in that order.
pub fn enhance(mut img: RgbImage) -> RgbImage {
    adjust_contrast(&mut img, CONTRAST_FACTOR);
    adjust_brightness(&mut img, BRIGHTNESS_FACTOR);
    img
}

/// Stretch every channel away from the rounded mean luminance by `factor`.
pub fn adjust_contrast(img: &mut RgbImage, factor: f32) {
    let mean = mean_luma(img) as f32;
    for px in img.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = blend(mean, *c as f32, factor);
        }
    }
}

/// Scale every channel by `factor`.
pub fn adjust_brightness(img: &mut RgbImage, factor: f32) {
    for px in img.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = blend(0.0, *c as f32, factor);
        }
    }
}

/// Interpolate from `base` towards `value` by `factor`, truncating into 0..=255.
fn blend(base: f32, value: f32, factor: f32) -> u8 {
    let out = base + factor * (value - base);
    // `as` saturates and truncates toward zero
    out.clamp(0.0, 255.0) as u8
}

/// Mean ITU-R 601-2 luma of the image, rounded to the nearest integer.
fn mean_luma(img: &RgbImage) -> u32 {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return 0;
    }
    let sum: u64 = img
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            (r as u64 * 19595 + g as u64 * 38470 + b as u64 * 7471 + 0x8000) >> 16
        })
        .sum();
    (sum as f64 / count as f64 + 0.5) as u32
}
