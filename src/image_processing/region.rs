use image::{imageops, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;

use super::binarize;

/// Fraction of the page a candidate box must exceed on each axis
const MIN_SIZE_FRACTION: f64 = 0.3;
/// Fraction of the page a candidate box must stay below on each axis,
/// rejecting the page border itself
const MAX_SIZE_FRACTION: f64 = 0.95;

/// Axis-aligned bounding box in original-image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Rectangle spanned by two opposite corners, in either order
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Self {
        let x1 = a.0.min(b.0);
        let y1 = a.1.min(b.1);
        let x2 = a.0.max(b.0);
        let y2 = a.1.max(b.1);
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Detect crop candidates for a manuscript page.
///
/// Binarizes with ink bright, closes nearby strokes into contiguous blobs,
/// extracts outer contours (falling back to the full hierarchy when the
/// closing merged everything into a single page-boundary contour), then
/// keeps the boxes satisfying the size bounds, largest first.
pub fn detect_candidates(image: &RgbImage, close_kernel: u8) -> Vec<BoundingBox> {
    let gray = imageops::grayscale(image);
    let ink = binarize::binarize_ink_bright(&gray);
    let closed = close(&ink, Norm::LInf, (close_kernel / 2).max(1));

    let contours = find_contours::<i32>(&closed);
    let outer: Vec<&Contour<i32>> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .collect();

    // A single outer contour usually means the closing merged everything
    // into the page boundary; the hole contours then carry the real
    // candidates.
    let pool: Vec<&Contour<i32>> = if outer.len() == 1 {
        contours.iter().collect()
    } else {
        outer
    };

    let (width, height) = image.dimensions();
    let mut candidates: Vec<BoundingBox> = pool
        .iter()
        .filter_map(|c| contour_bounding_box(c))
        .filter(|b| within_size_bounds(b, width, height))
        .collect();

    candidates.sort_by(|a, b| b.area().cmp(&a.area()));
    candidates
}

/// Size invariant for crop candidates: strictly between 30% and 95% of the
/// page on both axes, and fully inside the page.
pub fn within_size_bounds(bb: &BoundingBox, image_width: u32, image_height: u32) -> bool {
    let min_w = image_width as f64 * MIN_SIZE_FRACTION;
    let max_w = image_width as f64 * MAX_SIZE_FRACTION;
    let min_h = image_height as f64 * MIN_SIZE_FRACTION;
    let max_h = image_height as f64 * MAX_SIZE_FRACTION;

    (bb.width as f64) > min_w
        && (bb.width as f64) < max_w
        && (bb.height as f64) > min_h
        && (bb.height as f64) < max_h
        && bb.x + bb.width <= image_width
        && bb.y + bb.height <= image_height
}

/// Crop a page to a bounding box
pub fn crop_to_box(image: &RgbImage, bb: &BoundingBox) -> RgbImage {
    imageops::crop_imm(image, bb.x, bb.y, bb.width, bb.height).to_image()
}

fn contour_bounding_box(contour: &Contour<i32>) -> Option<BoundingBox> {
    let first = contour.points.first()?;
    let (mut min_x, mut max_x) = (first.x, first.x);
    let (mut min_y, mut max_y) = (first.y, first.y);

    for p in &contour.points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    if min_x < 0 || min_y < 0 {
        return None;
    }

    Some(BoundingBox {
        x: min_x as u32,
        y: min_y as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}
