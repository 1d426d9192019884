use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default extension filters, per subcommand
pub const DESKEW_EXTENSIONS: &str = "png,jpg,jpeg,tif,tiff";
pub const CROP_EXTENSIONS: &str = "jpg,jpeg,png";
pub const DEGRADE_EXTENSIONS: &str = "png,jpg,jpeg";

#[derive(Parser, Debug)]
#[command(
    name = "manuscript-processor",
    about = "Batch preparation and synthetic degradation of scanned manuscript images",
    long_about = "
Manuscript Processor

Prepares scanned historical manuscripts for OCR and analysis work, and
produces synthetically damaged variants for degradation studies. Three
independent pipelines are exposed as subcommands; each reads a folder of
images, applies a fixed sequence of imaging operations, and writes the
results into an output folder.

Example Usage:
  # Straighten every page in a folder (writes NAME_deskewed.png files)
  manuscript-processor deskew -i ~/scans -o ~/deskewed

  # Review detected manuscript regions interactively and crop them
  manuscript-processor crop -i ~/deskewed -o ~/cropped

  # Crop non-interactively with a scripted signal sequence
  manuscript-processor crop -i ~/deskewed -o ~/cropped --script n,a

  # Overlay reproducible wormhole damage plus binarized variants
  manuscript-processor degrade -i ~/cropped -o ~/damaged \\
    --background ~/reference/parchment.png --seed 0 --preset heavy"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate and correct page skew for every image in the input folders
    Deskew(DeskewArgs),
    /// Locate and crop the manuscript region, automatically or manually
    Crop(CropArgs),
    /// Overlay synthetic wormhole damage and emit a binarized variant
    Degrade(DegradeArgs),
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Input directories or single image files (can be specified multiple times)
    #[arg(short = 'i', long = "input", required = true, value_name = "DIR|FILE")]
    pub input_paths: Vec<PathBuf>,

    /// Output directory for processed images (created if absent)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Comma-separated list of image extensions to process (overrides the
    /// subcommand's default set)
    #[arg(long = "extensions", value_name = "LIST")]
    pub extensions_str: Option<String>,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CommonArgs {
    /// Extension filter for this run, lowercased and deduplicated of blanks
    pub fn extensions(&self, default: &str) -> Vec<String> {
        parse_extensions(self.extensions_str.as_deref().unwrap_or(default))
    }
}

#[derive(Args, Debug)]
pub struct DeskewArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Minimum detected angle in degrees before a rotation is applied
    #[arg(long = "threshold", default_value = "0.5", value_name = "DEGREES")]
    pub threshold: f32,
}

#[derive(Args, Debug)]
pub struct CropArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Side length in pixels of the square closing kernel that merges ink
    /// strokes into contiguous blobs
    #[arg(long = "close-kernel", default_value = "5", value_name = "PIXELS")]
    pub close_kernel: u8,

    /// Review every file with this fixed signal sequence instead of the
    /// interactive terminal (e.g. "a", "n,a", or "m,p:10,10,p:200,150,a")
    #[arg(long = "script", value_name = "SIGNALS")]
    pub script: Option<String>,
}

#[derive(Debug, Clone, ValueEnum, PartialEq, Eq)]
pub enum PresetName {
    /// Broad tunnels with deep charring (the archival-study configuration)
    #[value(name = "heavy")]
    Heavy,
    /// Narrow tunnels with subtle shadows
    #[value(name = "light")]
    Light,
}

#[derive(Args, Debug)]
pub struct DegradeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Reference background image revealed inside the tunnels (resized to
    /// each input's dimensions when they differ)
    #[arg(short = 'b', long = "background", value_name = "FILE")]
    pub background: PathBuf,

    /// Seed for the batch random generator; identical seeds reproduce
    /// identical output byte-for-byte
    #[arg(long = "seed", default_value = "0", value_name = "SEED")]
    pub seed: u64,

    /// Number of tunnels per image, drawn from this inclusive range
    #[arg(long = "tunnels", default_value = "20..40", value_name = "MIN..MAX")]
    pub tunnels_str: String,

    /// Path length in steps of each tunnel, drawn from this inclusive range
    #[arg(long = "lengths", default_value = "20..50", value_name = "MIN..MAX")]
    pub lengths_str: String,

    /// Built-in damage parameter preset
    #[arg(long = "preset", default_value = "heavy", value_name = "NAME")]
    pub preset: PresetName,

    /// JSON file overriding the built-in preset parameters
    #[arg(long = "preset-file", value_name = "FILE")]
    pub preset_file: Option<PathBuf>,
}

impl DegradeArgs {
    pub fn tunnel_range(&self) -> Result<(u32, u32), String> {
        parse_range(&self.tunnels_str)
    }

    pub fn length_range(&self) -> Result<(u32, u32), String> {
        parse_range(&self.lengths_str)
    }
}

/// Parse a comma-separated extension list into a lowercase vector
pub fn parse_extensions(extensions: &str) -> Vec<String> {
    extensions
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse an inclusive "MIN..MAX" range
pub fn parse_range(range: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = range.split("..").collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid range '{}'. Use MIN..MAX (e.g. 20..40)",
            range
        ));
    }

    let min = parts[0]
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Invalid range minimum: '{}'", parts[0]))?;
    let max = parts[1]
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("Invalid range maximum: '{}'", parts[1]))?;

    if min == 0 {
        return Err("Range minimum must be greater than 0".to_string());
    }
    if max < min {
        return Err(format!("Range maximum {} is below minimum {}", max, min));
    }

    Ok((min, max))
}
