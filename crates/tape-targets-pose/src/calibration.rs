//! Resolution-keyed camera calibration artifacts.
//!
//! One JSON file per capture resolution, named `calibration{w}x{h}.json`,
//! holding the 3×3 intrinsic matrix and the distortion coefficients. A
//! missing or unreadable artifact is fatal to the pipeline: without the
//! matching intrinsics no pose can be trusted, so there is no default
//! and no retry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("camera calibration artifact not found or unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed calibration artifact {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("calibration artifact {path} carries a non-invertible camera matrix")]
    SingularMatrix { path: PathBuf },
}

/// On-disk artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationFile {
    /// Row-major 3×3 intrinsic matrix.
    pub camera_matrix: [[f64; 3]; 3],
    /// `[k1, k2, p1, p2, k3]`; shorter vectors are zero-padded.
    pub distortion_coefficients: Vec<f64>,
}

/// Radial-tangential distortion coefficients.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    pub fn from_coefficients(coeffs: &[f64]) -> Self {
        let c = |i: usize| coeffs.get(i).copied().unwrap_or(0.0);
        Self {
            k1: c(0),
            k2: c(1),
            p1: c(2),
            p2: c(3),
            k3: c(4),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Loaded intrinsics for one capture resolution. Immutable once loaded.
#[derive(Clone, Debug)]
pub struct CameraCalibration {
    pub camera_matrix: Matrix3<f64>,
    pub camera_matrix_inv: Matrix3<f64>,
    pub distortion: Distortion,
}

impl CameraCalibration {
    pub fn from_parts(
        camera_matrix: Matrix3<f64>,
        distortion: Distortion,
    ) -> Option<Self> {
        let camera_matrix_inv = camera_matrix.try_inverse()?;
        Some(Self {
            camera_matrix,
            camera_matrix_inv,
            distortion,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let raw = fs::read_to_string(path).map_err(|source| CalibrationError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CalibrationFile =
            serde_json::from_str(&raw).map_err(|source| CalibrationError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let m = file.camera_matrix;
        let camera_matrix = Matrix3::new(
            m[0][0], m[0][1], m[0][2], //
            m[1][0], m[1][1], m[1][2], //
            m[2][0], m[2][1], m[2][2],
        );
        let distortion = Distortion::from_coefficients(&file.distortion_coefficients);
        Self::from_parts(camera_matrix, distortion).ok_or(CalibrationError::SingularMatrix {
            path: path.to_path_buf(),
        })
    }

    /// Undo lens distortion, returning ideal pixel coordinates.
    ///
    /// Fixed-point iteration on the normalized coordinates; five rounds
    /// are ample for the mild distortion of a calibrated board camera.
    pub fn undistort_points(&self, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
        if self.distortion.is_zero() {
            return points.to_vec();
        }

        let k = &self.camera_matrix;
        let (fx, fy) = (k[(0, 0)], k[(1, 1)]);
        let (cx, cy) = (k[(0, 2)], k[(1, 2)]);
        let d = self.distortion;

        points
            .iter()
            .map(|p| {
                let x0 = (p.x - cx) / fx;
                let y0 = (p.y - cy) / fy;
                let mut x = x0;
                let mut y = y0;
                for _ in 0..5 {
                    let r2 = x * x + y * y;
                    let icdist = 1.0 / (1.0 + ((d.k3 * r2 + d.k2) * r2 + d.k1) * r2);
                    let dx = 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
                    let dy = d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;
                    x = (x0 - dx) * icdist;
                    y = (y0 - dy) * icdist;
                }
                Point2::new(fx * x + cx, fy * y + cy)
            })
            .collect()
    }
}

/// Memoized calibration loader, keyed by `(width, height)` of the
/// incoming frame. Loaded lazily on first use of a resolution and
/// read-only thereafter.
#[derive(Debug)]
pub struct CalibrationStore {
    dir: PathBuf,
    cache: HashMap<(u32, u32), CameraCalibration>,
}

impl CalibrationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn artifact_path(&self, width: u32, height: u32) -> PathBuf {
        self.dir.join(format!("calibration{width}x{height}.json"))
    }

    pub fn get(&mut self, width: u32, height: u32) -> Result<&CameraCalibration, CalibrationError> {
        if !self.cache.contains_key(&(width, height)) {
            let path = self.artifact_path(width, height);
            let calibration = CameraCalibration::load(&path)?;
            log::info!("loaded camera calibration from {}", path.display());
            self.cache.insert((width, height), calibration);
        }
        Ok(&self.cache[&(width, height)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn write_artifact(dir: &Path, w: u32, h: u32, fx: f64) {
        let file = CalibrationFile {
            camera_matrix: [[fx, 0.0, 320.0], [0.0, fx, 240.0], [0.0, 0.0, 1.0]],
            distortion_coefficients: vec![0.0; 5],
        };
        let path = dir.join(format!("calibration{w}x{h}.json"));
        fs::write(path, serde_json::to_string_pretty(&file).unwrap()).unwrap();
    }

    #[test]
    fn loads_and_memoizes_per_resolution() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), 640, 480, 600.0);

        let mut store = CalibrationStore::new(dir.path());
        let fx = store.get(640, 480).unwrap().camera_matrix[(0, 0)];
        assert_relative_eq!(fx, 600.0);

        // Swap the artifact on disk; the cached copy must win.
        write_artifact(dir.path(), 640, 480, 900.0);
        let fx = store.get(640, 480).unwrap().camera_matrix[(0, 0)];
        assert_relative_eq!(fx, 600.0);
    }

    #[test]
    fn unknown_resolution_is_an_error_not_a_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CalibrationStore::new(dir.path());
        let err = store.get(1280, 720).unwrap_err();
        assert!(matches!(err, CalibrationError::Unreadable { .. }));
    }

    #[test]
    fn short_coefficient_vectors_are_zero_padded() {
        let d = Distortion::from_coefficients(&[0.1, -0.05]);
        assert_relative_eq!(d.k1, 0.1);
        assert_relative_eq!(d.k2, -0.05);
        assert_eq!(d.p1, 0.0);
        assert_eq!(d.k3, 0.0);
    }

    #[test]
    fn undistort_round_trips_distorted_projections() {
        let k = Matrix3::new(600.0, 0.0, 320.0, 0.0, 600.0, 240.0, 0.0, 0.0, 1.0);
        let d = Distortion {
            k1: -0.12,
            k2: 0.03,
            p1: 0.001,
            p2: -0.0005,
            k3: 0.0,
        };
        let calib = CameraCalibration::from_parts(k, d).unwrap();

        // Distort a grid of ideal points, then undo it.
        let ideal: Vec<Point2<f64>> = (0..4)
            .flat_map(|j| (0..4).map(move |i| {
                Point2::new(220.0 + 60.0 * i as f64, 160.0 + 50.0 * j as f64)
            }))
            .collect();
        let distorted: Vec<Point2<f64>> = ideal
            .iter()
            .map(|p| {
                let x = (p.x - 320.0) / 600.0;
                let y = (p.y - 240.0) / 600.0;
                let r2 = x * x + y * y;
                let radial = 1.0 + d.k1 * r2 + d.k2 * r2 * r2;
                let xd = x * radial + 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
                let yd = y * radial + d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;
                Point2::new(600.0 * xd + 320.0, 600.0 * yd + 240.0)
            })
            .collect();

        for (u, p) in calib.undistort_points(&distorted).iter().zip(&ideal) {
            assert_relative_eq!(u.x, p.x, epsilon = 0.05);
            assert_relative_eq!(u.y, p.y, epsilon = 0.05);
        }
    }
}
