pub mod binarize;
pub mod deskew;
pub mod preview;
pub mod region;
pub mod resize;
pub mod review;
pub mod terminal;
pub mod wormholes;

use anyhow::{Context, Result};
use console::style;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::{
    CropArgs, DegradeArgs, DeskewArgs, PresetName, CROP_EXTENSIONS, DEGRADE_EXTENSIONS,
    DESKEW_EXTENSIONS,
};
use crate::error::PipelineError;
use crate::utils::{
    create_progress_bar, display_name, has_valid_extension, validate_inputs, verbose_println,
    warn_println,
};
use review::{parse_script, ReviewOutcome, ReviewSession};
use terminal::{ReviewUi, ScriptedReview, TerminalReview};
use wormholes::DamagePreset;

/// Per-batch accounting. Individual failures never change the process exit
/// status; they only show up here.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Discover all image files in the input paths
pub fn discover_images(
    input_paths: &[PathBuf],
    extensions: &[String],
    verbose: bool,
) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    for input_path in input_paths {
        verbose_println(verbose, &format!("Scanning: {}", input_path.display()));

        let walker = WalkDir::new(input_path).follow_links(false).max_depth(10);

        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && has_valid_extension(path, extensions) {
                image_files.push(path.to_path_buf());
            }
        }
    }

    // Sort for consistent processing order
    image_files.sort();

    verbose_println(verbose, &format!("Found {} image files", image_files.len()));
    Ok(image_files)
}

fn load_rgb(path: &Path) -> Result<RgbImage, PipelineError> {
    let img = image::open(path).map_err(|source| PipelineError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Straighten every discovered page
pub fn run_deskew(args: &DeskewArgs) -> Result<BatchSummary> {
    let extensions = args.common.extensions(DESKEW_EXTENSIONS);
    validate_inputs(&args.common.input_paths, &extensions)?;

    let files = discover_images(&args.common.input_paths, &extensions, args.common.verbose)?;
    let mut summary = BatchSummary::default();

    if files.is_empty() {
        warn_println("No images found with the specified extensions");
        return Ok(summary);
    }

    fs::create_dir_all(&args.common.output_dir).context("Failed to create output directory")?;

    let pb = create_progress_bar(files.len() as u64);
    pb.set_message("Estimating skew");

    for path in &files {
        let filename = display_name(path);
        match deskew_one(path, &args.common.output_dir, args.threshold, args.common.verbose) {
            Ok(outcome) => {
                summary.processed += 1;
                if outcome.corrected {
                    pb.println(format!(
                        "{} {} ({:.2}\u{b0})",
                        style("corrected").green(),
                        filename,
                        outcome.angle
                    ));
                } else {
                    pb.println(format!(
                        "{} {} ({:.2}\u{b0})",
                        style("already aligned").dim(),
                        filename,
                        outcome.angle
                    ));
                }
            }
            Err(e) => {
                summary.failed += 1;
                pb.println(format!(
                    "{} {}: {:#}",
                    style("failed").red().bold(),
                    filename,
                    e
                ));
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("deskew complete");
    Ok(summary)
}

fn deskew_one(
    path: &Path,
    output_dir: &Path,
    threshold: f32,
    verbose: bool,
) -> Result<deskew::DeskewOutcome> {
    let image = load_rgb(path)?;
    let (result, outcome) = deskew::deskew_image(&image, threshold)?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let out_path = output_dir.join(format!("{}_deskewed.png", stem));
    result
        .save(&out_path)
        .with_context(|| format!("Failed to save: {}", out_path.display()))?;

    verbose_println(verbose, &format!("Saved: {}", out_path.display()));
    Ok(outcome)
}

/// Review and crop the manuscript region of every discovered page
pub fn run_crop(args: &CropArgs) -> Result<BatchSummary> {
    let extensions = args.common.extensions(CROP_EXTENSIONS);
    validate_inputs(&args.common.input_paths, &extensions)?;

    let files = discover_images(&args.common.input_paths, &extensions, args.common.verbose)?;
    let mut summary = BatchSummary::default();

    if files.is_empty() {
        warn_println("No images found with the specified extensions");
        return Ok(summary);
    }

    fs::create_dir_all(&args.common.output_dir).context("Failed to create output directory")?;

    let mut ui: Box<dyn ReviewUi> = match &args.script {
        Some(script) => {
            let signals = parse_script(script).map_err(|e| anyhow::anyhow!(e))?;
            Box::new(ScriptedReview::new(signals))
        }
        None => Box::new(TerminalReview::new(args.common.output_dir.join("preview"))?),
    };

    for path in &files {
        let filename = display_name(path);
        ui.begin_file();
        match crop_one(
            path,
            &args.common.output_dir,
            args.close_kernel,
            ui.as_mut(),
            args.common.verbose,
        ) {
            Ok(ReviewOutcome::Selected(_)) => summary.processed += 1,
            Ok(ReviewOutcome::NoSelection) => {
                summary.skipped += 1;
                warn_println(&format!("No region selected for {}", filename));
            }
            Ok(ReviewOutcome::Skipped) => {
                summary.skipped += 1;
                println!("{} {}", style("skipped").yellow(), filename);
            }
            Err(e) => {
                summary.failed += 1;
                warn_println(&format!("{}: {:#}", filename, e));
            }
        }
    }

    Ok(summary)
}

fn crop_one(
    path: &Path,
    output_dir: &Path,
    close_kernel: u8,
    ui: &mut dyn ReviewUi,
    verbose: bool,
) -> Result<ReviewOutcome> {
    let image = load_rgb(path)?;
    let filename = display_name(path);

    let candidates = region::detect_candidates(&image, close_kernel);
    verbose_println(
        verbose,
        &format!("{}: {} candidate region(s)", filename, candidates.len()),
    );

    let mut session = ReviewSession::new(candidates);
    let outcome = loop {
        let signal = ui.next_signal(&image, filename, &session)?;
        if let Some(outcome) = session.handle(signal) {
            break outcome;
        }
    };

    if let ReviewOutcome::Selected(bb) = outcome {
        let cropped = region::crop_to_box(&image, &bb);
        let out_path = output_dir.join(filename);
        cropped
            .save(&out_path)
            .with_context(|| format!("Failed to save: {}", out_path.display()))?;
        println!("{} {}", style("Saved:").green(), out_path.display());
    }

    Ok(outcome)
}

/// Overlay wormhole damage on every discovered page
pub fn run_degrade(args: &DegradeArgs) -> Result<BatchSummary> {
    let extensions = args.common.extensions(DEGRADE_EXTENSIONS);
    validate_inputs(&args.common.input_paths, &extensions)?;

    let tunnels = args.tunnel_range().map_err(|e| anyhow::anyhow!(e))?;
    let lengths = args.length_range().map_err(|e| anyhow::anyhow!(e))?;

    let preset = match &args.preset_file {
        Some(path) => DamagePreset::from_json_file(path)?,
        None => match args.preset {
            PresetName::Heavy => DamagePreset::heavy(),
            PresetName::Light => DamagePreset::light(),
        },
    };

    let background = load_rgb(&args.background)
        .with_context(|| format!("Failed to load background: {}", args.background.display()))?;

    let files = discover_images(&args.common.input_paths, &extensions, args.common.verbose)?;
    let mut summary = BatchSummary::default();

    if files.is_empty() {
        warn_println("No images found with the specified extensions");
        return Ok(summary);
    }

    let bw_dir = args.common.output_dir.join("bw");
    fs::create_dir_all(&bw_dir).context("Failed to create output directories")?;

    // One generator for the whole batch; the seed makes every run
    // byte-for-byte reproducible
    let mut rng = StdRng::seed_from_u64(args.seed);

    let pb = create_progress_bar(files.len() as u64);
    pb.set_message("Painting tunnels");

    for path in &files {
        let filename = display_name(path);
        let num_tunnels = rng.random_range(tunnels.0..=tunnels.1);

        match degrade_one(
            path,
            &args.common.output_dir,
            &bw_dir,
            &background,
            num_tunnels,
            lengths,
            &preset,
            &mut rng,
        ) {
            Ok(()) => {
                summary.processed += 1;
                verbose_println(
                    args.common.verbose,
                    &format!("{}: {} tunnels", filename, num_tunnels),
                );
            }
            Err(e) => {
                summary.failed += 1;
                pb.println(format!(
                    "{} {}: {:#}",
                    style("failed").red().bold(),
                    filename,
                    e
                ));
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("degradation complete");
    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
fn degrade_one(
    path: &Path,
    output_dir: &Path,
    bw_dir: &Path,
    background: &RgbImage,
    num_tunnels: u32,
    length_range: (u32, u32),
    preset: &DamagePreset,
    rng: &mut StdRng,
) -> Result<()> {
    let image = load_rgb(path)?;
    let damaged = wormholes::simulate_damage(
        &image,
        background,
        num_tunnels,
        length_range,
        preset,
        rng,
    )?;

    let filename = display_name(path);
    let color_path = output_dir.join(filename);
    let bw_path = bw_dir.join(filename);

    damaged
        .color
        .save(&color_path)
        .with_context(|| format!("Failed to save: {}", color_path.display()))?;
    damaged
        .binarized
        .save(&bw_path)
        .with_context(|| format!("Failed to save: {}", bw_path.display()))?;

    Ok(())
}
