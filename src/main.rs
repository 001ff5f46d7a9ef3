use std::path::{Path, PathBuf};
use std::time::Instant;
use std::fs;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use mask_contour_rust_lib::debug_render::save_structure_debug;
use mask_contour_rust_lib::output::{write_statistics_csv, write_structure_set};
use mask_contour_rust_lib::{
    load_volume, structure_statistics, Config, ContourVolumeAdapter, SmoothingLevel, StructureSet,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Label volume to contour structure set conversion")]
struct Args {
    /// Path to input volume JSON
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Smoothing level (overwrites config)
    #[clap(short = 's', long)]
    smoothing: Option<SmoothingArg>,

    /// Worker threads for per-slice extraction (overwrites config)
    #[clap(short = 'j', long)]
    threads: Option<usize>,

    /// Save a PNG per contoured slice
    #[clap(short, long)]
    debug: bool,

    /// Log per-slice detail
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SmoothingArg {
    #[value(name = "none")]
    Exact,
    Small,
    Large,
}

impl From<SmoothingArg> for SmoothingLevel {
    fn from(arg: SmoothingArg) -> Self {
        match arg {
            SmoothingArg::Exact => SmoothingLevel::None,
            SmoothingArg::Small => SmoothingLevel::Small,
            SmoothingArg::Large => SmoothingLevel::Large,
        }
    }
}

const DEBUG_SCALE: u32 = 8;

fn load_config(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        Config::from_file(path).with_context(|| format!("Failed to load config {}", path))
    } else {
        log::warn!("Config file {} not found, using defaults", path);
        Ok(Config::default())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let mut config = load_config(&args.config)?;

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if let Some(level) = args.smoothing {
        config.smoothing_level = level.into();
    }

    if args.threads.is_some() {
        config.num_threads = args.threads;
    }

    config.validate()?;

    let input_path = PathBuf::from(&config.input_path);
    if !input_path.is_file() {
        bail!("Input volume {} does not exist", input_path.display());
    }

    let start_time = Instant::now();

    let output_base = PathBuf::from(&config.output_base_dir);
    fs::create_dir_all(&output_base)?;

    let input = load_volume(&input_path)
        .with_context(|| format!("Failed to load volume {}", input_path.display()))?;
    log::info!(
        "Processing {} ({}x{}x{})",
        input_path.display(),
        input.volume.width(),
        input.volume.height(),
        input.volume.depth()
    );

    let stats = structure_statistics(&input.volume, config.background_label, &input.transform)?;
    write_statistics_csv(&stats, &output_base, &input.filename)?;

    let adapter = ContourVolumeAdapter::from_config(&config);
    let mut structure_set = StructureSet::new(input.transform.clone());
    let mut failed = Vec::new();

    for (label, result) in adapter.extract_all(&input.volume) {
        let contours = match result {
            Ok(contours) => contours,
            Err(e) if e.is_slice_local() => {
                log::error!("Skipping label {}: {}", label, e);
                failed.push(label);
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to convert label {}", label)),
        };

        log::debug!("Label {}: {} contour points", label, contours.point_count());

        if args.debug {
            let debug_dir = output_base.join("debug");
            save_structure_debug(&input.volume, &contours, config.background_label, DEBUG_SCALE, &debug_dir)?;
        }

        if config.smoothing_level.is_persistable() {
            structure_set.push(&contours, &format!("label_{}", label))?;
        }
    }

    if config.smoothing_level.is_persistable() {
        write_structure_set(&structure_set, &output_base, &input.filename)?;
    } else {
        log::warn!(
            "{:?} smoothing is for display only, no structure set written",
            config.smoothing_level
        );
    }

    if !failed.is_empty() {
        log::warn!("{} structure(s) failed to convert: {:?}", failed.len(), failed);
    }

    let elapsed = start_time.elapsed();
    log::info!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
