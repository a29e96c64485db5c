use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use frame_source_core::capture::capture_resolver::CaptureResolver;
use frame_source_core::capture::domain::capture_options::{CaptureOptions, Resolution};
use frame_source_core::capture::domain::read_metrics::LatencyMetrics;
use frame_source_core::capture::infrastructure::system_decoder::SystemDecoder;

const PROGRESS_INTERVAL: usize = 100;

/// Opens an image, image directory, video file or camera index and reads
/// frames from it.
#[derive(Parser)]
#[command(name = "frame-source")]
struct Cli {
    /// Image file, directory of images, video file, or camera index.
    input: String,

    /// Restart from the initial frame when the source runs out.
    #[arg(long = "loop")]
    looping: bool,

    /// Index of the first frame to read.
    #[arg(long)]
    initial_frame: Option<usize>,

    /// Frames to read per pass (must be positive).
    #[arg(long)]
    read_limit: Option<usize>,

    /// Camera resolution as WIDTHxHEIGHT.
    #[arg(long)]
    camera_resolution: Option<Resolution>,

    /// JSON file with capture options; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many frames (needed to end a looping source).
    #[arg(long)]
    max_frames: Option<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let options = build_options(&cli)?;

    let metrics = Arc::new(LatencyMetrics::new());
    let resolver = CaptureResolver::new(Arc::new(SystemDecoder::new()), metrics.clone());
    let mut source = resolver.open(&cli.input, &options)?;
    log::info!(
        "Reading {} as {} at {:.2} fps",
        cli.input,
        source.kind(),
        source.frame_rate()
    );

    let max_frames = cli.max_frames.unwrap_or(usize::MAX);
    let mut count = 0;
    while count < max_frames {
        let Some(frame) = source.read()? else {
            break;
        };
        count += 1;
        if count % PROGRESS_INTERVAL == 0 {
            log::info!(
                "Read {count} frames (last: #{} {}x{}, mean {:.1}, center {:?})",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.mean_intensity(),
                frame.pixel(frame.width() / 2, frame.height() / 2).unwrap_or_default()
            );
        }
    }

    log::info!("Read {count} frames from {}", cli.input);
    metrics.log_summary();
    Ok(())
}

fn build_options(cli: &Cli) -> Result<CaptureOptions, Box<dyn std::error::Error>> {
    let mut options = match &cli.config {
        Some(path) => CaptureOptions::from_json_file(path)?,
        None => CaptureOptions::default(),
    };
    if cli.looping {
        options = options.with_looping(true);
    }
    if let Some(index) = cli.initial_frame {
        options = options.with_initial_frame_index(index);
    }
    if let Some(limit) = cli.read_limit {
        options = options.with_read_length_limit(limit);
    }
    if let Some(resolution) = cli.camera_resolution {
        options = options.with_camera_resolution(resolution);
    }
    Ok(options)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.read_limit == Some(0) {
        return Err("Read limit must be positive, got 0".into());
    }
    if cli.max_frames == Some(0) {
        return Err("Max frames must be positive, got 0".into());
    }
    if let Some(path) = &cli.config {
        if !path.is_file() {
            return Err(format!("Config file not found: {}", path.display()).into());
        }
    }
    Ok(())
}
