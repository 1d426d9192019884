use anyhow::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use super::region::BoundingBox;
use super::resize;
use super::review::ReviewSession;

/// Review previews are fitted into this window
pub const SCREEN_WIDTH: u32 = 1280;
pub const SCREEN_HEIGHT: u32 = 720;

const CANDIDATE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const CURRENT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MANUAL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// A rendered review frame plus the downscale factor that was applied.
/// The scale travels with the frame so every coordinate mapping uses the
/// value of the render it belongs to.
pub struct PreviewFrame {
    pub image: RgbImage,
    pub scale: f32,
}

/// Draw the current review state over a copy of the page: all candidate
/// boxes, the candidate under review highlighted, and any manual corner
/// points or rectangle.
pub fn render_review_frame(page: &RgbImage, session: &ReviewSession) -> Result<PreviewFrame> {
    let mut canvas = page.clone();

    for bb in session.candidates() {
        draw_box(&mut canvas, bb, CANDIDATE_COLOR, 1);
    }
    if let Some(bb) = session.current().copied() {
        draw_box(&mut canvas, &bb, CURRENT_COLOR, 3);
    }

    let (first, second) = session.manual_points();
    for point in [first, second].into_iter().flatten() {
        draw_filled_circle_mut(
            &mut canvas,
            (point.0 as i32, point.1 as i32),
            5,
            MANUAL_COLOR,
        );
    }
    if let (Some(a), Some(b)) = (first, second) {
        let bb = BoundingBox::from_corners(a, b);
        if !bb.is_empty() {
            draw_box(&mut canvas, &bb, MANUAL_COLOR, 2);
        }
    }

    let (image, scale) = resize::fit_within(&canvas, SCREEN_WIDTH, SCREEN_HEIGHT)?;
    Ok(PreviewFrame { image, scale })
}

/// Map a preview coordinate back into original-image space through the
/// frame's scale, clamped to the page bounds.
pub fn map_to_image_space(
    x: u32,
    y: u32,
    scale: f32,
    (width, height): (u32, u32),
) -> (u32, u32) {
    let ix = ((x as f32 / scale) as u32).min(width.saturating_sub(1));
    let iy = ((y as f32 / scale) as u32).min(height.saturating_sub(1));
    (ix, iy)
}

fn draw_box(canvas: &mut RgbImage, bb: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    if bb.is_empty() {
        return;
    }
    for t in 0..thickness {
        let rect = Rect::at(bb.x as i32 - t as i32, bb.y as i32 - t as i32)
            .of_size(bb.width + 2 * t, bb.height + 2 * t);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
