use image::{imageops, GrayImage, Luma, Rgb, RgbImage};

use super::binarize;
use crate::error::PipelineError;

/// Candidate sweep for the projection search, in degrees
const MIN_ANGLE: f32 = -5.0;
const MAX_ANGLE: f32 = 5.0;
const ANGLE_STEP: f32 = 0.5;

/// Result of running the estimator over one page
#[derive(Debug, Clone, Copy)]
pub struct DeskewOutcome {
    /// Detected skew in degrees
    pub angle: f32,
    /// Whether a rotation was actually applied
    pub corrected: bool,
}

/// Estimate the skew of a binarized page where ink is brighter than the
/// background.
///
/// Sweeps candidate angles from -5.0 to +5.0 degrees in 0.5 degree steps,
/// rotating the page and measuring the variance of the per-row mean
/// intensity. Correctly horizontal text lines produce periodic bright/dark
/// bands in that projection; skew smears rows together and lowers the
/// variance. First-seen wins on ties.
pub fn estimate_skew_angle(gray: &GrayImage) -> Result<f32, PipelineError> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidInput(format!(
            "cannot estimate skew of a {}x{} buffer",
            width, height
        )));
    }

    let mut best_angle = 0.0_f32;
    let mut max_variance = 0.0_f64;

    let mut angle = MIN_ANGLE;
    while angle <= MAX_ANGLE {
        let rotated = rotate_gray_replicate(gray, angle);
        let variance = projection_variance(&rotated);
        if variance > max_variance {
            max_variance = variance;
            best_angle = angle;
        }
        angle += ANGLE_STEP;
    }

    Ok(best_angle)
}

/// Binarize a color page, fix the polarity so ink is bright, estimate the
/// skew, and rotate the original when it exceeds the threshold (degrees).
pub fn deskew_image(
    image: &RgbImage,
    threshold: f32,
) -> Result<(RgbImage, DeskewOutcome), PipelineError> {
    let gray = imageops::grayscale(image);
    let bw = binarize::binarize_ink_bright(&gray);

    let angle = estimate_skew_angle(&bw)?;

    if angle.abs() < threshold {
        let outcome = DeskewOutcome {
            angle,
            corrected: false,
        };
        Ok((image.clone(), outcome))
    } else {
        let outcome = DeskewOutcome {
            angle,
            corrected: true,
        };
        Ok((rotate_rgb_replicate(image, angle), outcome))
    }
}

/// Variance of the horizontal projection (per-row mean intensity)
fn projection_variance(gray: &GrayImage) -> f64 {
    let width = gray.width();
    let mut row_means = Vec::with_capacity(gray.height() as usize);
    for row in gray.rows() {
        let sum: u64 = row.map(|p| p.0[0] as u64).sum();
        row_means.push(sum as f64 / width as f64);
    }

    let mean = row_means.iter().sum::<f64>() / row_means.len() as f64;
    row_means
        .iter()
        .map(|m| (m - mean).powi(2))
        .sum::<f64>()
        / row_means.len() as f64
}

/// Rotate a grayscale page about its center with bilinear sampling, clamping
/// source coordinates to the image edge (replicate extrapolation) so the
/// borders never bias the projection with a constant fill color.
pub fn rotate_gray_replicate(gray: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (width / 2) as f32;
    let cy = (height / 2) as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = cos * dx - sin * dy + cx;
        let sy = sin * dx + cos * dy + cy;
        Luma([sample_gray_clamped(gray, sx, sy)])
    })
}

/// Rotate a color page about its center with the same convention as
/// `rotate_gray_replicate`, so the correction applies exactly the angle the
/// estimator scored.
pub fn rotate_rgb_replicate(image: &RgbImage, degrees: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (width / 2) as f32;
    let cy = (height / 2) as f32;

    RgbImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = cos * dx - sin * dy + cx;
        let sy = sin * dx + cos * dy + cy;
        sample_rgb_clamped(image, sx, sy)
    })
}

fn sample_gray_clamped(img: &GrayImage, x: f32, y: f32) -> u8 {
    let Weights { x0, x1, y0, y1, fx, fy } = clamped_weights(img.dimensions(), x, y);
    let p00 = img.get_pixel(x0, y0).0[0] as f32;
    let p10 = img.get_pixel(x1, y0).0[0] as f32;
    let p01 = img.get_pixel(x0, y1).0[0] as f32;
    let p11 = img.get_pixel(x1, y1).0[0] as f32;
    bilinear(p00, p10, p01, p11, fx, fy).round() as u8
}

fn sample_rgb_clamped(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let Weights { x0, x1, y0, y1, fx, fy } = clamped_weights(img.dimensions(), x, y);
    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut channels = [0u8; 3];
    for (c, out) in channels.iter_mut().enumerate() {
        *out = bilinear(
            p00[c] as f32,
            p10[c] as f32,
            p01[c] as f32,
            p11[c] as f32,
            fx,
            fy,
        )
        .round() as u8;
    }
    Rgb(channels)
}

struct Weights {
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
    fx: f32,
    fy: f32,
}

fn clamped_weights((width, height): (u32, u32), x: f32, y: f32) -> Weights {
    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    Weights {
        x0,
        x1: (x0 + 1).min(width - 1),
        y0,
        y1: (y0 + 1).min(height - 1),
        fx: x - x0 as f32,
        fy: y - y0 as f32,
    }
}

fn bilinear(p00: f32, p10: f32, p01: f32, p11: f32, fx: f32, fy: f32) -> f32 {
    let top = p00 + (p10 - p00) * fx;
    let bottom = p01 + (p11 - p01) * fx;
    top + (bottom - top) * fy
}
