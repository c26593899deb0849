//! Offline single-frame runner.
//!
//! Replays captured segmentation artifacts (mask PNG + contours JSON)
//! through the full pipeline: telemetry goes to stdout, the annotated
//! overlay and a JSON report go wherever the config points.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use image::{Rgb, RgbImage};
use log::{error, info, LevelFilter};

use tape_targets::io::{load_contours_json, load_mask_png, FrameReport, PipelineConfig};
use tape_targets::{PrecomputedSegmenter, Segmentation, TapePipeline, TelemetryWriter};

#[derive(Parser, Debug)]
#[command(
    name = "tape-targets",
    about = "Range a two-strip tape target from captured segmentation artifacts"
)]
struct Args {
    /// Pipeline configuration JSON.
    config: PathBuf,

    /// Enable debug logging.
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = tape_targets::core::init_with_level(level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Calibration failures land here too: fatal by design.
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = PipelineConfig::load_json(&args.config)?;

    let mask = load_mask_png(&cfg.mask_path)?;
    let contours = load_contours_json(&cfg.contours_path)?;

    let frame: RgbImage = match &cfg.frame_path {
        Some(path) => image::open(path)?.to_rgb8(),
        None => {
            let (w, h) = (mask.width as u32, mask.height as u32);
            RgbImage::from_fn(w, h, |x, y| {
                let v = mask.data[y as usize * mask.width + x as usize];
                Rgb([v, v, v])
            })
        }
    };

    let segmenter = PrecomputedSegmenter::new(Segmentation { contours, mask });
    let mut pipeline = TapePipeline::new(segmenter, &cfg.calibration_dir, cfg.params.clone());

    let stdout = std::io::stdout();
    let mut telemetry = TelemetryWriter::new(stdout.lock());
    let result = pipeline.process_frame(&frame, &mut telemetry)?;

    if let Some(path) = &cfg.overlay_path {
        result.overlay.save(path)?;
        info!("wrote overlay to {path}");
    }

    let report = FrameReport::new(&result);
    let report_path = cfg.report_path();
    report.write_json(&report_path)?;
    info!(
        "ranged {} of {} candidates; report at {}",
        report.targets.len(),
        report.candidate_count,
        report_path.display()
    );

    Ok(())
}
