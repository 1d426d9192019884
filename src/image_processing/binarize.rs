use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

/// Global binarization with automatic threshold selection.
///
/// Pixels at or above the Otsu level become white (255), the rest black (0).
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    let mut binary = gray.clone();
    for p in binary.pixels_mut() {
        *p = if p.0[0] >= level { Luma([255]) } else { Luma([0]) };
    }
    binary
}

/// Mean pixel intensity of a grayscale image
pub fn mean_intensity(gray: &GrayImage) -> f64 {
    if gray.is_empty() {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / gray.len() as f64
}

/// Flip every pixel between black and white
pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut inverted = gray.clone();
    for p in inverted.pixels_mut() {
        p.0[0] = 255 - p.0[0];
    }
    inverted
}

/// Binarize so that ink is white on a black field.
///
/// Manuscript scans are dark ink on light parchment; after Otsu the majority
/// class (background) is white, so a light mean means the polarity has to be
/// flipped before contour extraction or projection analysis.
pub fn binarize_ink_bright(gray: &GrayImage) -> GrayImage {
    let binary = otsu_binarize(gray);
    if mean_intensity(&binary) > 127.0 {
        invert(&binary)
    } else {
        binary
    }
}

/// Binarize so that ink is dark on a light field, the polarity expected by
/// OCR tooling. Inverts only when the overall binary mean comes out dark.
pub fn binarize_ink_dark(gray: &GrayImage) -> GrayImage {
    let binary = otsu_binarize(gray);
    if mean_intensity(&binary) < 127.0 {
        invert(&binary)
    } else {
        binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Dark "text" strokes on a light page
    fn test_page() -> GrayImage {
        let mut img = GrayImage::from_pixel(60, 40, Luma([230]));
        for y in (8..32).step_by(8) {
            for x in 10..50 {
                img.put_pixel(x, y, Luma([25]));
            }
        }
        img
    }

    #[test]
    fn test_otsu_binarize_is_binary() {
        let binary = otsu_binarize(&test_page());
        for p in binary.pixels() {
            assert!(p.0[0] == 0 || p.0[0] == 255, "non-binary pixel {}", p.0[0]);
        }
    }

    #[test]
    fn test_ink_bright_polarity() {
        let bw = binarize_ink_bright(&test_page());
        // Ink is the minority class, so the mean must be dark
        assert!(mean_intensity(&bw) < 127.0);
        // A stroke pixel is white, the page is black
        assert_eq!(bw.get_pixel(20, 8).0[0], 255);
        assert_eq!(bw.get_pixel(20, 4).0[0], 0);
    }

    #[test]
    fn test_ink_dark_polarity() {
        let bw = binarize_ink_dark(&test_page());
        assert!(mean_intensity(&bw) > 127.0);
        assert_eq!(bw.get_pixel(20, 8).0[0], 0);
        assert_eq!(bw.get_pixel(20, 4).0[0], 255);
    }

    #[test]
    fn test_ink_dark_inverts_dark_majority() {
        // White text on a black field should come back flipped
        let mut img = GrayImage::from_pixel(40, 40, Luma([10]));
        for x in 5..35 {
            img.put_pixel(x, 20, Luma([250]));
        }
        let bw = binarize_ink_dark(&img);
        assert!(mean_intensity(&bw) > 127.0);
        assert_eq!(bw.get_pixel(20, 20).0[0], 0);
    }

    #[test]
    fn test_mean_intensity_empty_image() {
        let img = GrayImage::new(0, 0);
        assert_eq!(mean_intensity(&img), 0.0);
    }
}
