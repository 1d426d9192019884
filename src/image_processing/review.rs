use super::region::BoundingBox;

/// Logical review commands, decoupled from whatever surface produces them.
/// `Point` coordinates are always in original-image space; adapters working
/// on a scaled preview map them back before emitting the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Accept,
    Next,
    Manual,
    Reset,
    Cancel,
    Point(u32, u32),
}

/// Terminal state of one review session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Crop to this rectangle and write the result
    Selected(BoundingBox),
    /// The candidate list was exhausted (or empty) without a choice
    NoSelection,
    /// The reviewer explicitly moved on
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Reviewing,
    Manual {
        first: Option<(u32, u32)>,
        second: Option<(u32, u32)>,
    },
}

/// Interactive review of crop candidates for one page.
///
/// The session is a pure state machine over a signal stream; rendering and
/// input collection live in adapters, so a scripted signal list drives it
/// exactly like a human at the terminal does.
#[derive(Debug)]
pub struct ReviewSession {
    candidates: Vec<BoundingBox>,
    index: usize,
    mode: Mode,
}

impl ReviewSession {
    pub fn new(candidates: Vec<BoundingBox>) -> Self {
        Self {
            candidates,
            index: 0,
            mode: Mode::Reviewing,
        }
    }

    /// Candidate currently under review, if any remain
    pub fn current(&self) -> Option<&BoundingBox> {
        self.candidates.get(self.index)
    }

    pub fn candidates(&self) -> &[BoundingBox] {
        &self.candidates
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn in_manual_mode(&self) -> bool {
        matches!(self.mode, Mode::Manual { .. })
    }

    /// Corner points placed so far in manual mode
    pub fn manual_points(&self) -> (Option<(u32, u32)>, Option<(u32, u32)>) {
        match self.mode {
            Mode::Manual { first, second } => (first, second),
            Mode::Reviewing => (None, None),
        }
    }

    /// Feed one signal into the machine. `Some` terminates the session.
    pub fn handle(&mut self, signal: Signal) -> Option<ReviewOutcome> {
        match &mut self.mode {
            Mode::Reviewing => match signal {
                Signal::Accept => match self.current() {
                    Some(bb) => Some(ReviewOutcome::Selected(*bb)),
                    None => Some(ReviewOutcome::NoSelection),
                },
                Signal::Next => {
                    self.index += 1;
                    if self.index >= self.candidates.len() {
                        Some(ReviewOutcome::NoSelection)
                    } else {
                        None
                    }
                }
                Signal::Manual => {
                    self.mode = Mode::Manual {
                        first: None,
                        second: None,
                    };
                    None
                }
                Signal::Cancel => Some(ReviewOutcome::Skipped),
                // Points and resets mean nothing outside manual mode
                Signal::Point(_, _) | Signal::Reset => None,
            },
            Mode::Manual { first, second } => match signal {
                Signal::Point(x, y) => {
                    if first.is_none() {
                        *first = Some((x, y));
                    } else if second.is_none() {
                        *second = Some((x, y));
                    }
                    None
                }
                // Re-entering manual mode resets the selection, as does an
                // explicit reset
                Signal::Reset | Signal::Manual => {
                    *first = None;
                    *second = None;
                    None
                }
                Signal::Accept => match (first, second) {
                    (Some(a), Some(b)) => {
                        let bb = BoundingBox::from_corners(*a, *b);
                        if bb.is_empty() {
                            // Degenerate rectangle; keep the session open so
                            // the reviewer can reset and try again
                            None
                        } else {
                            Some(ReviewOutcome::Selected(bb))
                        }
                    }
                    _ => None,
                },
                Signal::Cancel => Some(ReviewOutcome::Skipped),
                Signal::Next => None,
            },
        }
    }
}

/// Parse a scripted signal list: comma-separated `a` (accept), `n` (next),
/// `m` (manual), `r` (reset), `c` (cancel) and `p:X,Y` points in
/// original-image coordinates.
pub fn parse_script(script: &str) -> Result<Vec<Signal>, String> {
    let mut signals = Vec::new();
    let mut tokens = script.split(',').map(str::trim);

    while let Some(token) = tokens.next() {
        if token.is_empty() {
            continue;
        }
        match token {
            "a" => signals.push(Signal::Accept),
            "n" => signals.push(Signal::Next),
            "m" => signals.push(Signal::Manual),
            "r" => signals.push(Signal::Reset),
            "c" => signals.push(Signal::Cancel),
            _ => {
                if let Some(x_str) = token.strip_prefix("p:") {
                    // The Y coordinate is the following comma-separated token
                    let y_str = tokens
                        .next()
                        .ok_or_else(|| format!("point '{}' is missing its Y coordinate", token))?;
                    let x = x_str
                        .parse::<u32>()
                        .map_err(|_| format!("invalid point X coordinate '{}'", x_str))?;
                    let y = y_str
                        .parse::<u32>()
                        .map_err(|_| format!("invalid point Y coordinate '{}'", y_str))?;
                    signals.push(Signal::Point(x, y));
                } else {
                    return Err(format!("unknown review signal '{}'", token));
                }
            }
        }
    }

    Ok(signals)
}
