use anyhow::Result;
use fast_image_resize::{images::Image, ResizeOptions, Resizer};
use image::{ImageBuffer, Rgb, RgbImage};
use std::num::NonZeroU32;

/// Resize an image to exact dimensions using high-quality filtering
pub fn resize_exact(img: &RgbImage, width: u32, height: u32) -> Result<RgbImage> {
    let (src_width, src_height) = img.dimensions();

    if src_width == width && src_height == height {
        return Ok(img.clone());
    }

    // Convert to the format expected by fast_image_resize
    let src_pixels: Vec<u8> = img.pixels().flat_map(|p| [p[0], p[1], p[2]]).collect();

    let src_width_nz =
        NonZeroU32::new(src_width).ok_or_else(|| anyhow::anyhow!("Source width is zero"))?;
    let src_height_nz =
        NonZeroU32::new(src_height).ok_or_else(|| anyhow::anyhow!("Source height is zero"))?;
    let dst_width_nz =
        NonZeroU32::new(width).ok_or_else(|| anyhow::anyhow!("Target width is zero"))?;
    let dst_height_nz =
        NonZeroU32::new(height).ok_or_else(|| anyhow::anyhow!("Target height is zero"))?;

    let src_image = Image::from_vec_u8(
        src_width_nz.into(),
        src_height_nz.into(),
        src_pixels,
        fast_image_resize::PixelType::U8x3,
    )?;

    let mut dst_image = Image::new(
        dst_width_nz.into(),
        dst_height_nz.into(),
        fast_image_resize::PixelType::U8x3,
    );

    let mut resizer = Resizer::new();
    resizer.resize(&src_image, &mut dst_image, Some(&ResizeOptions::default()))?;

    // Convert back to RgbImage
    let dst_pixels = dst_image.buffer();
    let mut output = ImageBuffer::new(width, height);

    for (i, pixel) in output.pixels_mut().enumerate() {
        let base_idx = i * 3;
        if base_idx + 2 < dst_pixels.len() {
            *pixel = Rgb([
                dst_pixels[base_idx],
                dst_pixels[base_idx + 1],
                dst_pixels[base_idx + 2],
            ]);
        }
    }

    Ok(output)
}

/// Downscale an image to fit within the given bounds without distortion.
/// Returns the resized image and the scale that was applied (1.0 when the
/// image already fits); callers map preview coordinates back to image space
/// through that scale.
pub fn fit_within(img: &RgbImage, max_width: u32, max_height: u32) -> Result<(RgbImage, f32)> {
    let (width, height) = img.dimensions();
    let scale = (max_width as f32 / width as f32)
        .min(max_height as f32 / height as f32)
        .min(1.0);

    if scale >= 1.0 {
        return Ok((img.clone(), 1.0));
    }

    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);
    let resized = resize_exact(img, new_width, new_height)?;
    Ok((resized, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_resize_exact() {
        let img = create_test_image(100, 100);
        let resized = resize_exact(&img, 50, 50).unwrap();
        assert_eq!(resized.dimensions(), (50, 50));
    }

    #[test]
    fn test_resize_exact_noop_for_same_size() {
        let img = create_test_image(64, 48);
        let resized = resize_exact(&img, 64, 48).unwrap();
        assert_eq!(resized.as_raw(), img.as_raw());
    }

    #[test]
    fn test_fit_within_passes_small_images_through() {
        let img = create_test_image(640, 360);
        let (resized, scale) = fit_within(&img, 1280, 720).unwrap();
        assert_eq!(scale, 1.0);
        assert_eq!(resized.dimensions(), (640, 360));
    }

    #[test]
    fn test_fit_within_downscales_preserving_aspect() {
        let img = create_test_image(2560, 1440);
        let (resized, scale) = fit_within(&img, 1280, 720).unwrap();
        assert!((scale - 0.5).abs() < 1e-6);
        assert_eq!(resized.dimensions(), (1280, 720));
    }
}
