//! JSON configuration and report helpers for offline pipeline runs.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use tape_targets_core::{BinaryImage, Contour};

use crate::pipeline::{FrameResult, PipelineParams, TargetObservation};

#[derive(thiserror::Error, Debug)]
pub enum PipelineIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Configuration for one offline pipeline run over captured
/// segmentation artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Mask PNG written by the segmentation stage.
    pub mask_path: String,
    /// Contours JSON: an array of contours, each an array of `[x, y]`.
    pub contours_path: String,
    /// Directory holding `calibration{w}x{h}.json` artifacts.
    pub calibration_dir: String,
    /// Optional original frame; the mask doubles as the overlay
    /// background when absent.
    #[serde(default)]
    pub frame_path: Option<String>,
    #[serde(default)]
    pub overlay_path: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
    #[serde(default)]
    pub params: PipelineParams,
}

impl PipelineConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PipelineIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PipelineIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the report output path.
    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tape_targets_report.json"))
    }
}

/// Load the segmentation mask from a grayscale PNG.
pub fn load_mask_png(path: impl AsRef<Path>) -> Result<BinaryImage, PipelineIoError> {
    let img = image::open(path)?.to_luma8();
    Ok(BinaryImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.into_raw(),
    })
}

/// Load captured contours from JSON (`[[[x, y], ...], ...]`).
pub fn load_contours_json(path: impl AsRef<Path>) -> Result<Vec<Contour>, PipelineIoError> {
    let raw = fs::read_to_string(path)?;
    let lists: Vec<Vec<[f64; 2]>> = serde_json::from_str(&raw)?;
    Ok(lists
        .into_iter()
        .map(|points| points.into_iter().map(|[x, y]| Point2::new(x, y)).collect())
        .collect())
}

/// Per-target record in the frame report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRecord {
    pub target_index: usize,
    pub distance: f64,
    pub lateral: f64,
    pub depth: f64,
    pub center: [f64; 2],
    /// Roll/pitch/yaw in degrees.
    pub euler_deg: [f64; 3],
}

impl From<&TargetObservation> for TargetRecord {
    fn from(obs: &TargetObservation) -> Self {
        Self {
            target_index: obs.target_index,
            distance: obs.distance,
            lateral: obs.lateral,
            depth: obs.depth,
            center: [obs.center.x, obs.center.y],
            euler_deg: [
                obs.euler.roll.to_degrees(),
                obs.euler.pitch.to_degrees(),
                obs.euler.yaw.to_degrees(),
            ],
        }
    }
}

/// Summary of one processed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    pub contour_count: usize,
    pub candidate_count: usize,
    pub targets: Vec<TargetRecord>,
}

impl FrameReport {
    pub fn new(result: &FrameResult) -> Self {
        Self {
            contour_count: result.contour_count,
            candidate_count: result.candidate_count,
            targets: result.observations.iter().map(TargetRecord::from).collect(),
        }
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PipelineIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let cfg = PipelineConfig {
            mask_path: "mask.png".into(),
            contours_path: "contours.json".into(),
            calibration_dir: "/etc/camera".into(),
            frame_path: None,
            overlay_path: Some("overlay.png".into()),
            report_path: None,
            params: PipelineParams::default(),
        };
        cfg.write_json(&path).unwrap();
        let back = PipelineConfig::load_json(&path).unwrap();
        assert_eq!(back.mask_path, cfg.mask_path);
        assert_eq!(back.overlay_path, cfg.overlay_path);
        assert_eq!(back.report_path(), PathBuf::from("tape_targets_report.json"));
    }

    #[test]
    fn contours_parse_from_nested_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contours.json");
        fs::write(&path, "[[[1.0, 2.0], [3.0, 4.5]], []]").unwrap();
        let contours = load_contours_json(&path).unwrap();
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0][1], Point2::new(3.0, 4.5));
        assert!(contours[1].is_empty());
    }
}
