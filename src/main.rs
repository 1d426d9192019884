use anyhow::Result;
use clap::Parser;
use console::style;
use std::time::Instant;

mod cli;
mod error;
mod image_processing;
mod utils;

use cli::{Cli, Command};
use utils::format_duration;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    // Print banner
    println!("{}", style("Manuscript Processor").bold().blue());
    println!(
        "{}",
        style("Preparation and synthetic degradation of manuscript scans").dim()
    );
    println!();

    let summary = match &cli.command {
        Command::Deskew(args) => image_processing::run_deskew(args)?,
        Command::Crop(args) => image_processing::run_crop(args)?,
        Command::Degrade(args) => image_processing::run_degrade(args)?,
    };

    let total_time = start_time.elapsed();
    let total = summary.processed + summary.skipped + summary.failed;

    println!();
    println!("{}", style("Results Summary:").bold().green());
    println!(
        "  Successfully processed: {}",
        style(summary.processed).bold().green()
    );
    if summary.skipped > 0 {
        println!("  Skipped: {}", style(summary.skipped).bold().yellow());
    }
    if summary.failed > 0 {
        println!("  Failed: {}", style(summary.failed).bold().red());
    }

    println!();
    println!("{}", style("Performance:").bold().blue());
    println!(
        "  Total processing time: {}",
        style(format_duration(total_time)).bold()
    );
    if total > 0 {
        println!(
            "  Average time per image: {}",
            style(format_duration(total_time / total as u32)).dim()
        );
    }

    Ok(())
}
