use anyhow::{Context, Result};
use console::{style, Key, Term};
use image::RgbImage;
use std::path::{Path, PathBuf};

use super::preview::{self, PreviewFrame};
use super::review::{ReviewSession, Signal};

/// Source of review signals for one page. The batch driver renders nothing
/// itself; it asks the UI for the next signal and feeds it to the session.
pub trait ReviewUi {
    /// Called once per file before its review loop starts
    fn begin_file(&mut self) {}

    fn next_signal(
        &mut self,
        page: &RgbImage,
        filename: &str,
        session: &ReviewSession,
    ) -> Result<Signal>;
}

/// Replays a fixed signal list; used by `--script` runs and tests. Point
/// coordinates are taken verbatim in original-image space. An exhausted
/// script cancels so a too-short sequence can never hang a batch.
pub struct ScriptedReview {
    script: Vec<Signal>,
    cursor: usize,
}

impl ScriptedReview {
    pub fn new(script: Vec<Signal>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Rewind for the next file so every page sees the same sequence
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl ReviewUi for ScriptedReview {
    fn begin_file(&mut self) {
        self.rewind();
    }

    fn next_signal(&mut self, _: &RgbImage, _: &str, _: &ReviewSession) -> Result<Signal> {
        let signal = self
            .script
            .get(self.cursor)
            .copied()
            .unwrap_or(Signal::Cancel);
        self.cursor += 1;
        Ok(signal)
    }
}

/// Interactive terminal review. Each turn writes the current frame to a
/// preview file for the reviewer to open, then reads a keypress (or, in
/// manual mode, a typed coordinate pair in preview space).
pub struct TerminalReview {
    term: Term,
    preview_dir: PathBuf,
}

impl TerminalReview {
    pub fn new(preview_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&preview_dir)
            .with_context(|| format!("Failed to create preview directory: {}", preview_dir.display()))?;
        Ok(Self {
            term: Term::stdout(),
            preview_dir,
        })
    }

    fn save_preview(&self, frame: &PreviewFrame, filename: &str) -> Result<PathBuf> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("preview");
        let path = self.preview_dir.join(format!("{}.png", stem));
        frame
            .image
            .save(&path)
            .with_context(|| format!("Failed to save preview: {}", path.display()))?;
        Ok(path)
    }

    fn read_review_key(&self) -> Result<Signal> {
        let signal = match self.term.read_key()? {
            Key::Char('y') | Key::Enter => Signal::Accept,
            Key::Char('n') => Signal::Next,
            Key::Char('m') => Signal::Manual,
            Key::Escape => Signal::Cancel,
            // Any other key skips the file
            _ => Signal::Cancel,
        };
        Ok(signal)
    }

    fn read_manual_input(&self, frame: &PreviewFrame, page_dims: (u32, u32)) -> Result<Signal> {
        loop {
            let line = self.term.read_line()?;
            match line.trim() {
                "y" | "" => return Ok(Signal::Accept),
                "m" | "r" => return Ok(Signal::Reset),
                "q" | "c" | "esc" => return Ok(Signal::Cancel),
                input => {
                    if let Some((x, y)) = parse_point(input) {
                        // The mapping uses the scale of the frame the
                        // reviewer is looking at, passed explicitly
                        let (ix, iy) = preview::map_to_image_space(x, y, frame.scale, page_dims);
                        return Ok(Signal::Point(ix, iy));
                    }
                    self.term.write_line(&format!(
                        "{} enter a corner as x,y — or 'm' reset, 'y' confirm, 'q' cancel",
                        style("[?]").yellow()
                    ))?;
                }
            }
        }
    }
}

impl ReviewUi for TerminalReview {
    fn next_signal(
        &mut self,
        page: &RgbImage,
        filename: &str,
        session: &ReviewSession,
    ) -> Result<Signal> {
        let frame = preview::render_review_frame(page, session)?;
        let preview_path = self.save_preview(&frame, filename)?;

        if session.in_manual_mode() {
            let placed = match session.manual_points() {
                (None, None) => 0,
                (Some(_), None) => 1,
                _ => 2,
            };
            self.term.write_line(&format!(
                "{} — manual selection, {}/2 corners placed (preview: {})",
                style(filename).bold(),
                placed,
                style(preview_path.display()).dim()
            ))?;
            self.term.write_line(
                "  corner as x,y in preview coordinates — 'm' reset, 'y'/Enter confirm, 'q' cancel",
            )?;
            self.read_manual_input(&frame, page.dimensions())
        } else {
            let total = session.candidates().len();
            let position = if total == 0 {
                "no candidates".to_string()
            } else {
                format!("contour {}/{}", session.index() + 1, total)
            };
            self.term.write_line(&format!(
                "{} — {} — 'y'/Enter save, 'n' next, 'm' manual, other skip (preview: {})",
                style(filename).bold(),
                position,
                style(preview_path.display()).dim()
            ))?;
            self.read_review_key()
        }
    }
}

fn parse_point(input: &str) -> Option<(u32, u32)> {
    let (x_str, y_str) = input.split_once(',')?;
    let x = x_str.trim().parse::<u32>().ok()?;
    let y = y_str.trim().parse::<u32>().ok()?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::region::BoundingBox;
    use crate::image_processing::review::ReviewOutcome;
    use image::Rgb;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("10,20"), Some((10, 20)));
        assert_eq!(parse_point(" 5 , 7 "), Some((5, 7)));
        assert_eq!(parse_point("10"), None);
        assert_eq!(parse_point("a,b"), None);
    }

    #[test]
    fn test_scripted_review_replays_and_cancels_when_exhausted() {
        let page = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let session = ReviewSession::new(Vec::new());
        let mut ui = ScriptedReview::new(vec![Signal::Next, Signal::Accept]);

        assert_eq!(
            ui.next_signal(&page, "f", &session).unwrap(),
            Signal::Next
        );
        assert_eq!(
            ui.next_signal(&page, "f", &session).unwrap(),
            Signal::Accept
        );
        assert_eq!(
            ui.next_signal(&page, "f", &session).unwrap(),
            Signal::Cancel
        );

        ui.rewind();
        assert_eq!(
            ui.next_signal(&page, "f", &session).unwrap(),
            Signal::Next
        );
    }

    #[test]
    fn test_scripted_manual_selection_drives_session() {
        let mut session = ReviewSession::new(vec![BoundingBox {
            x: 0,
            y: 0,
            width: 80,
            height: 80,
        }]);
        let page = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let mut ui = ScriptedReview::new(vec![
            Signal::Manual,
            Signal::Point(10, 10),
            Signal::Point(60, 40),
            Signal::Accept,
        ]);

        let outcome = loop {
            let signal = ui.next_signal(&page, "f", &session).unwrap();
            if let Some(outcome) = session.handle(signal) {
                break outcome;
            }
        };

        assert_eq!(
            outcome,
            ReviewOutcome::Selected(BoundingBox {
                x: 10,
                y: 10,
                width: 50,
                height: 30
            })
        );
    }
}
