use anyhow::{Context, Result};
use clap::Parser;
use image_meta::AppConfig;
use log::info;
use std::path::PathBuf;

/// Print the metadata of an image file as JSON.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Image file to inspect
    path: PathBuf,

    /// Configuration file (TOML, YAML, JSON, ...)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip dominant-color analysis
    #[arg(long)]
    no_colors: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if args.no_colors {
        config.analyze_colors = false;
    }

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting image-meta");

    let report = image_meta::extract_with_config(&args.path, &config)?;
    let json = serde_json::to_string_pretty(&report)?;

    match args.output {
        Some(output) => {
            std::fs::write(&output, json)
                .with_context(|| format!("writing report to {}", output.display()))?;
            info!("Report saved to {}", output.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
