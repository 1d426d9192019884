use anyhow::{Context, Result};
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::filter::gaussian_blur_f32;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_3;
use std::path::Path;

use super::{binarize, resize};

/// Mask values: the page survives where the mask is intact
pub const INTACT: u8 = 255;
pub const BREACHED: u8 = 0;

/// Tunable wormhole parameters. Two configurations ship as built-ins;
/// custom ones load from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamagePreset {
    /// Disk radius range painted along each tunnel path
    pub thickness_min: i32,
    pub thickness_max: i32,
    /// Vertical band, as fractions of the page height, tunnels start in
    pub band_top: f32,
    pub band_bottom: f32,
    /// Gaussian sigmas for the burn-ring band-pass at the breach edges
    pub outer_blur_sigma: f32,
    pub inner_blur_sigma: f32,
    /// Strength of the charring shadow at tunnel borders
    pub darkening: f32,
}

impl DamagePreset {
    /// Broad tunnels with deep charring
    pub fn heavy() -> Self {
        Self {
            thickness_min: 60,
            thickness_max: 80,
            band_top: 0.1,
            band_bottom: 0.9,
            outer_blur_sigma: 6.8,
            inner_blur_sigma: 1.5,
            darkening: 1.5,
        }
    }

    /// Narrow tunnels with subtle shadows, concentrated mid-page
    pub fn light() -> Self {
        Self {
            thickness_min: 10,
            thickness_max: 12,
            band_top: 0.3,
            band_bottom: 0.7,
            outer_blur_sigma: 2.5,
            inner_blur_sigma: 0.8,
            darkening: 1.3,
        }
    }

    /// Load a custom preset from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preset file: {}", path.display()))?;
        let preset: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse preset file: {}", path.display()))?;
        preset
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid preset {}: {}", path.display(), e))?;
        Ok(preset)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.thickness_min < 1 || self.thickness_max < self.thickness_min {
            return Err(format!(
                "thickness range {}..{} is not a positive ascending range",
                self.thickness_min, self.thickness_max
            ));
        }
        if !(0.0..=1.0).contains(&self.band_top)
            || !(0.0..=1.0).contains(&self.band_bottom)
            || self.band_bottom <= self.band_top
        {
            return Err(format!(
                "vertical band {}..{} must be an ascending range within 0..1",
                self.band_top, self.band_bottom
            ));
        }
        if self.outer_blur_sigma <= 0.0 || self.inner_blur_sigma <= 0.0 {
            return Err("blur sigmas must be positive".to_string());
        }
        if self.darkening < 0.0 {
            return Err("darkening factor must not be negative".to_string());
        }
        Ok(())
    }
}

/// One damaged page: the color composite and its binarized variant
pub struct DamagedPage {
    pub color: RgbImage,
    pub binarized: GrayImage,
}

/// Run the full degradation of one page. Background size mismatches are
/// resolved by resizing the background to the page, never an error.
pub fn simulate_damage(
    image: &RgbImage,
    background: &RgbImage,
    num_tunnels: u32,
    length_range: (u32, u32),
    preset: &DamagePreset,
    rng: &mut impl Rng,
) -> Result<DamagedPage> {
    let (width, height) = image.dimensions();
    let background = if background.dimensions() == (width, height) {
        background.clone()
    } else {
        resize::resize_exact(background, width, height)?
    };

    let mask = paint_tunnel_mask(width, height, num_tunnels, length_range, preset, rng);
    let color = apply_damage(image, &background, &mask, preset);
    let binarized = binarize::binarize_ink_dark(&imageops::grayscale(&color));

    Ok(DamagedPage { color, binarized })
}

/// Paint `num_tunnels` randomized tunnels onto a fresh mask
pub fn paint_tunnel_mask(
    width: u32,
    height: u32,
    num_tunnels: u32,
    length_range: (u32, u32),
    preset: &DamagePreset,
    rng: &mut impl Rng,
) -> GrayImage {
    let mut mask = GrayImage::from_pixel(width, height, Luma([INTACT]));
    for _ in 0..num_tunnels {
        paint_tunnel(&mut mask, length_range, preset, rng);
    }
    mask
}

fn paint_tunnel(
    mask: &mut GrayImage,
    length_range: (u32, u32),
    preset: &DamagePreset,
    rng: &mut impl Rng,
) {
    let (width, height) = mask.dimensions();
    let band_top = (height as f32 * preset.band_top) as u32;
    let band_bottom =
        ((height as f32 * preset.band_bottom) as u32).clamp(band_top, height.saturating_sub(1));

    let start_x = rng.random_range(0..width) as i32;
    let start_y = rng.random_range(band_top..=band_bottom) as i32;
    // Horizontal or gently diagonal, like real worm galleries
    let angle = rng.random_range(-FRAC_PI_3..FRAC_PI_3);
    let length = rng.random_range(length_range.0..=length_range.1);
    let thickness = rng.random_range(preset.thickness_min..=preset.thickness_max);

    for point in tunnel_points(width, height, (start_x, start_y), angle, length, rng) {
        draw_filled_circle_mut(mask, point, thickness, Luma([BREACHED]));
    }
}

/// Direction-biased random walk: a larger horizontal than vertical step,
/// small independent jitter on both axes, and a slowly wandering angle.
/// Every returned point is clamped into the page.
fn tunnel_points(
    width: u32,
    height: u32,
    start: (i32, i32),
    mut angle: f32,
    length: u32,
    rng: &mut impl Rng,
) -> Vec<(i32, i32)> {
    let (mut x, mut y) = start;
    let mut points = Vec::with_capacity(length as usize);

    for _ in 0..length {
        let dx = (angle.cos() * rng.random_range(4..=6) as f32) as i32;
        let dy = (angle.sin() * rng.random_range(2..=4) as f32) as i32;
        x = (x + dx + rng.random_range(-1..=1)).clamp(0, width as i32 - 1);
        y = (y + dy + rng.random_range(-1..=1)).clamp(0, height as i32 - 1);
        points.push((x, y));
        angle += rng.random_range(-0.15..0.15);
    }

    points
}

/// Band-pass over the breach edges: the inverted mask blurred at two radii,
/// inner subtracted from outer, normalized to [0, 1]
pub fn burn_ring(mask: &GrayImage, preset: &DamagePreset) -> Vec<f32> {
    let inverted = binarize::invert(mask);
    let outer = gaussian_blur_f32(&inverted, preset.outer_blur_sigma);
    let inner = gaussian_blur_f32(&inverted, preset.inner_blur_sigma);

    outer
        .pixels()
        .zip(inner.pixels())
        .map(|(o, i)| o.0[0].saturating_sub(i.0[0]) as f32 / 255.0)
        .collect()
}

/// Composite the background into the breached areas and darken the burn
/// ring to simulate charring at the tunnel borders
pub fn apply_damage(
    image: &RgbImage,
    background: &RgbImage,
    mask: &GrayImage,
    preset: &DamagePreset,
) -> RgbImage {
    let (width, height) = image.dimensions();
    let ring = burn_ring(mask, preset);

    RgbImage::from_fn(width, height, |x, y| {
        let source = if mask.get_pixel(x, y).0[0] == BREACHED {
            background.get_pixel(x, y)
        } else {
            image.get_pixel(x, y)
        };
        let shade = 1.0 - ring[(y * width + x) as usize] * preset.darkening;
        Rgb([
            shade_channel(source[0], shade),
            shade_channel(source[1], shade),
            shade_channel(source[2], shade),
        ])
    })
}

fn shade_channel(value: u8, shade: f32) -> u8 {
    (value as f32 * shade).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn white_page(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    fn black_background(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([0, 0, 0]))
    }

    #[test]
    fn test_same_seed_produces_identical_output() {
        let page = white_page(120, 80);
        let background = black_background(120, 80);
        let preset = DamagePreset::light();

        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);

        let a = simulate_damage(&page, &background, 4, (10, 20), &preset, &mut rng_a).unwrap();
        let b = simulate_damage(&page, &background, 4, (10, 20), &preset, &mut rng_b).unwrap();

        assert_eq!(a.color.as_raw(), b.color.as_raw());
        assert_eq!(a.binarized.as_raw(), b.binarized.as_raw());
    }

    #[test]
    fn test_mask_determinism() {
        let preset = DamagePreset::heavy();
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);

        let a = paint_tunnel_mask(300, 200, 6, (20, 50), &preset, &mut rng_a);
        let b = paint_tunnel_mask(300, 200, 6, (20, 50), &preset, &mut rng_b);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_tunnel_points_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let angle = rng.random_range(-FRAC_PI_3..FRAC_PI_3);
            let start = (
                rng.random_range(0..64) as i32,
                rng.random_range(0..48) as i32,
            );
            for (x, y) in tunnel_points(64, 48, start, angle, 200, &mut rng) {
                assert!((0..64).contains(&x), "x out of bounds: {x}");
                assert!((0..48).contains(&y), "y out of bounds: {y}");
            }
        }
    }

    #[test]
    fn test_mask_gets_breached() {
        let preset = DamagePreset::light();
        let mut rng = StdRng::seed_from_u64(1);
        let mask = paint_tunnel_mask(200, 200, 3, (20, 40), &preset, &mut rng);
        assert!(mask.pixels().any(|p| p.0[0] == BREACHED));
        assert!(mask.pixels().any(|p| p.0[0] == INTACT));
    }

    #[test]
    fn test_background_resized_on_mismatch() {
        let page = white_page(100, 60);
        let background = black_background(37, 23);
        let preset = DamagePreset::light();
        let mut rng = StdRng::seed_from_u64(5);

        let damaged =
            simulate_damage(&page, &background, 2, (10, 20), &preset, &mut rng).unwrap();
        assert_eq!(damaged.color.dimensions(), (100, 60));
        assert_eq!(damaged.binarized.dimensions(), (100, 60));
    }

    #[test]
    fn test_binarized_polarity() {
        let page = white_page(300, 300);
        let background = black_background(300, 300);
        let preset = DamagePreset::light();

        let mut mask_rng = StdRng::seed_from_u64(11);
        let mask = paint_tunnel_mask(300, 300, 2, (20, 40), &preset, &mut mask_rng);

        let mut rng = StdRng::seed_from_u64(11);
        let damaged =
            simulate_damage(&page, &background, 2, (20, 40), &preset, &mut rng).unwrap();

        let ring = burn_ring(&mask, &preset);
        let width = 300u32;
        let mut checked_intact = false;
        let mut checked_breached = false;

        for y in 0..300u32 {
            for x in 0..width {
                let idx = (y * width + x) as usize;
                if ring[idx] > 0.004 {
                    continue;
                }
                match mask.get_pixel(x, y).0[0] {
                    INTACT if !checked_intact => {
                        // Untouched page stays ink-absent (light)
                        assert_eq!(damaged.binarized.get_pixel(x, y).0[0], 255);
                        checked_intact = true;
                    }
                    BREACHED if !checked_breached => {
                        // Deep inside a tunnel the black background reads
                        // as foreground
                        assert_eq!(damaged.binarized.get_pixel(x, y).0[0], 0);
                        checked_breached = true;
                    }
                    _ => {}
                }
            }
        }

        assert!(checked_intact && checked_breached);
    }

    #[test]
    fn test_burn_ring_darkens_breach_edges() {
        let preset = DamagePreset::light();
        let mut mask = GrayImage::from_pixel(100, 100, Luma([INTACT]));
        draw_filled_circle_mut(&mut mask, (50, 50), 15, Luma([BREACHED]));

        let ring = burn_ring(&mask, &preset);
        // The band-pass peaks a few pixels outside the breach boundary and
        // vanishes in the far field
        let edge = ring[(50 * 100 + 32) as usize];
        let far = ring[(5 * 100 + 5) as usize];
        assert!(edge > 0.05, "expected shadow at breach edge, got {edge}");
        assert!(far < 0.004, "expected no shadow far away, got {far}");
    }

    #[test]
    fn test_preset_json_round_trip() {
        let preset = DamagePreset::heavy();
        let json = serde_json::to_string(&preset).unwrap();
        let parsed: DamagePreset = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, preset);
    }

    #[test]
    fn test_preset_validation() {
        assert!(DamagePreset::heavy().validate().is_ok());
        assert!(DamagePreset::light().validate().is_ok());

        let mut bad = DamagePreset::light();
        bad.thickness_max = 0;
        assert!(bad.validate().is_err());

        let mut bad = DamagePreset::light();
        bad.band_bottom = bad.band_top;
        assert!(bad.validate().is_err());

        let mut bad = DamagePreset::light();
        bad.outer_blur_sigma = 0.0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_preset_file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.json");
        std::fs::write(&path, serde_json::to_string(&DamagePreset::light()).unwrap()).unwrap();

        let loaded = DamagePreset::from_json_file(&path).unwrap();
        assert_eq!(loaded, DamagePreset::light());

        std::fs::write(&path, "{\"thickness_min\": 0}").unwrap();
        assert!(DamagePreset::from_json_file(&path).is_err());
    }
}
