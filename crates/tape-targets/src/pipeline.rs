//! Per-frame pipeline controller.
//!
//! Drives selection → refinement → pose solve for every discovered
//! target in a frame. The target model and the calibration cache are the
//! only state that outlives a frame; everything else is built and
//! dropped per call.

use std::io::Write;
use std::path::PathBuf;

use image::RgbImage;
use log::{debug, info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use tape_targets_core::morph_close_3x3;
use tape_targets_pose::{solve_planar_pnp, CalibrationError, CalibrationStore, EulerAngles};
use tape_targets_strip::{
    coarse_corners, descriptors, expand_image_corners, pair_descriptors, refine_corners,
    PairParams, RefineParams, StripConstants, TargetModel,
};

use crate::overlay;
use crate::segment::{Segmentation, Segmenter};
use crate::telemetry::TelemetryWriter;

/// All tunable settings of the pipeline, JSON-overridable.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineParams {
    #[serde(default)]
    pub constants: StripConstants,
    #[serde(default)]
    pub pair: PairParams,
    #[serde(default)]
    pub refine: RefineParams,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Missing calibration means no pose can be trusted: halt.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    /// The telemetry byte stream is gone; downstream control is blind.
    #[error("telemetry transport failed: {0}")]
    Telemetry(#[from] std::io::Error),
}

/// One successfully ranged target.
#[derive(Clone, Copy, Debug)]
pub struct TargetObservation {
    /// Index of the candidate within this frame, left to right.
    pub target_index: usize,
    /// Straight-line distance in the horizontal plane.
    pub distance: f64,
    /// Lateral (camera-x) offset.
    pub lateral: f64,
    /// Depth (camera-z) offset.
    pub depth: f64,
    /// Orientation, optional telemetry.
    pub euler: EulerAngles,
    /// Mean image position of the strip pair.
    pub center: Point2<f64>,
}

/// Everything a frame produced. Dropped by the caller at frame end.
#[derive(Debug)]
pub struct FrameResult {
    pub contour_count: usize,
    pub candidate_count: usize,
    pub observations: Vec<TargetObservation>,
    pub overlay: RgbImage,
}

/// The frame-at-a-time controller. Single-threaded and synchronous: a
/// frame is always processed to completion.
pub struct TapePipeline<S> {
    segmenter: S,
    params: PipelineParams,
    model: TargetModel,
    calibrations: CalibrationStore,
}

impl<S: Segmenter> TapePipeline<S> {
    pub fn new(segmenter: S, calibration_dir: impl Into<PathBuf>, params: PipelineParams) -> Self {
        let model = TargetModel::build(&params.constants);
        Self {
            segmenter,
            params,
            model,
            calibrations: CalibrationStore::new(calibration_dir),
        }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Process one frame: segment, pair, refine, solve, emit.
    ///
    /// Per-candidate failures are logged and skipped; only calibration
    /// and telemetry-transport failures abort the frame (and, for the
    /// calibration case, should halt the process).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip_all, fields(width = frame.width(), height = frame.height()))
    )]
    pub fn process_frame<W: Write>(
        &mut self,
        frame: &RgbImage,
        telemetry: &mut TelemetryWriter<W>,
    ) -> Result<FrameResult, PipelineError> {
        let Segmentation { contours, mask } = self.segmenter.segment(frame);

        let rects = descriptors(&contours);
        let candidates = pair_descriptors(&rects, &self.params.pair);

        // Mark every seen descriptor for the drivers, matched or not.
        let mut overlay_img = frame.clone();
        for (_, rect) in &rects {
            overlay::draw_rect(&mut overlay_img, rect, overlay::CONTOUR_COLOR);
        }

        let mut observations = Vec::new();
        if !candidates.is_empty() {
            // Lazy, first-frame-only cost per resolution. Fatal if the
            // artifact is absent.
            let calibration = self.calibrations.get(frame.width(), frame.height())?;
            let closed = morph_close_3x3(&mask.view());

            for (target_index, candidate) in candidates.iter().enumerate() {
                let left = &contours[candidate.left_contour];
                let right = &contours[candidate.right_contour];
                let Some(coarse) = coarse_corners(left, right) else {
                    debug!("candidate {target_index}: empty contour, skipped");
                    continue;
                };

                let corners = refine_corners(&closed.view(), &coarse, &self.params.refine);
                for corner in corners.as_array() {
                    overlay::draw_marker(&mut overlay_img, &corner, overlay::CORNER_COLOR);
                }

                let image_points = expand_image_corners(&corners);
                match solve_planar_pnp(self.model.points(), &image_points, calibration) {
                    Ok(pose) => {
                        let observation = TargetObservation {
                            target_index,
                            distance: pose.distance(),
                            lateral: pose.lateral(),
                            depth: pose.depth(),
                            euler: pose.euler_angles(),
                            center: candidate.center(),
                        };
                        telemetry.send(&observation)?;
                        observations.push(observation);
                    }
                    Err(err) => {
                        // Dropped from telemetry this frame only; the
                        // outline is already on the overlay.
                        warn!("candidate {target_index}: pose solve failed: {err}");
                    }
                }
            }
        }

        info!(
            "frame {}x{}: {} contours, {} candidates, {} targets ranged",
            frame.width(),
            frame.height(),
            contours.len(),
            candidates.len(),
            observations.len()
        );

        Ok(FrameResult {
            contour_count: contours.len(),
            candidate_count: candidates.len(),
            observations,
            overlay: overlay_img,
        })
    }
}
