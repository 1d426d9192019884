use std::path::PathBuf;
use thiserror::Error;

/// Per-file failure taxonomy. None of these abort a batch; the drivers log
/// them and advance to the next file.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read input image {path}: {source}")]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no contour satisfies the region size bounds and no manual selection was made")]
    NoCandidateRegion,

    #[error("invalid input buffer: {0}")]
    InvalidInput(String),
}
