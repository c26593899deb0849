//! High-level facade crate for the `tape-targets-*` workspace.
//!
//! Converts segmented contours of a retro-reflective two-strip tape
//! target into a range/bearing estimate, once per video frame:
//! contour pairing, sub-pixel corner refinement, and a planar
//! perspective pose solve, with telemetry and a debug overlay out the
//! other side.
//!
//! ## Quickstart
//!
//! ```no_run
//! use tape_targets::pipeline::{PipelineParams, TapePipeline};
//! use tape_targets::segment::{PrecomputedSegmenter, Segmentation};
//! use tape_targets::telemetry::TelemetryWriter;
//! use tape_targets::core::BinaryImage;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let segmentation = Segmentation {
//!     contours: Vec::new(),
//!     mask: BinaryImage::new(640, 480),
//! };
//! let segmenter = PrecomputedSegmenter::new(segmentation);
//! let mut pipeline = TapePipeline::new(segmenter, "/etc/camera", PipelineParams::default());
//!
//! let frame = image::RgbImage::new(640, 480);
//! let mut telemetry = TelemetryWriter::new(std::io::stdout().lock());
//! let result = pipeline.process_frame(&frame, &mut telemetry)?;
//! println!("targets this frame: {}", result.observations.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `tape_targets::core`: mask buffers, contours, min-area rectangles.
//! - `tape_targets::strip`: target model, pair selection, corner refinement.
//! - `tape_targets::pose`: calibration store and the planar pose solve.
//! - `tape_targets::pipeline`: the per-frame controller.
//! - `tape_targets::segment` / `telemetry` / `overlay` / `io`: the
//!   external boundaries (segmentation in; serial records, debug video,
//!   and JSON reports out).

pub use tape_targets_core as core;
pub use tape_targets_pose as pose;
pub use tape_targets_strip as strip;

pub mod io;
pub mod overlay;
pub mod pipeline;
pub mod segment;
pub mod telemetry;

pub use pipeline::{FrameResult, PipelineError, PipelineParams, TapePipeline, TargetObservation};
pub use segment::{PrecomputedSegmenter, Segmentation, Segmenter};
pub use telemetry::TelemetryWriter;

/// Install a `tracing` subscriber for the pipeline, reading the filter
/// from `RUST_LOG` and defaulting to `info`.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
