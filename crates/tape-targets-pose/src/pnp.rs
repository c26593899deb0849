//! Planar pose solve.
//!
//! The target model lives on the plane `z = 0` in its own frame, which
//! makes the general 12-parameter resection rank-deficient. Instead the
//! solve estimates the plane-to-image homography with a normalized DLT
//! and decomposes `K⁻¹H = [r1 r2 t]` into a rotation and translation,
//! projecting the rotation onto SO(3).

use nalgebra::{DMatrix, Matrix3, Point2, Point3, Rotation3, Vector3};

use crate::calibration::CameraCalibration;
use crate::euler::{euler_from_rotation, rotation_from_rvec, EulerAngles};

#[derive(thiserror::Error, Debug)]
pub enum PnpError {
    #[error("planar solve requires at least {required} correspondences, got {got}")]
    InsufficientCorrespondences { required: usize, got: usize },
    #[error("model has {model} points but image has {image}")]
    MismatchedCorrespondences { model: usize, image: usize },
    #[error("degenerate correspondence geometry")]
    Degenerate,
    #[error("SVD failed during the pose solve")]
    SvdFailed,
}

/// Camera-relative pose of one target, plus derived scalar outputs.
///
/// Created per candidate per frame and handed straight to telemetry;
/// never retained across frames.
#[derive(Clone, Copy, Debug)]
pub struct PoseEstimate {
    /// Rodrigues rotation vector, target frame to camera frame.
    pub rvec: Vector3<f64>,
    /// Translation of the target origin in camera coordinates.
    pub tvec: Vector3<f64>,
}

impl PoseEstimate {
    /// Straight-line distance in the horizontal plane: the Euclidean
    /// norm of the (x, z) translation components. Camera height and tilt
    /// are ignored by design of the mounting.
    pub fn distance(&self) -> f64 {
        self.tvec.x.hypot(self.tvec.z)
    }

    /// Lateral offset of the target, camera x.
    pub fn lateral(&self) -> f64 {
        self.tvec.x
    }

    /// Depth of the target along the optical axis, camera z.
    pub fn depth(&self) -> f64 {
        self.tvec.z
    }

    /// Optional orientation telemetry.
    pub fn euler_angles(&self) -> EulerAngles {
        euler_from_rotation(&rotation_from_rvec(&self.rvec))
    }
}

/// Solve the pose of a planar model (z = 0) from image correspondences.
///
/// `model` and `image` are index-aligned correspondence lists; the order
/// contract is owned by the target model builder.
pub fn solve_planar_pnp(
    model: &[Point3<f64>],
    image: &[Point2<f64>],
    calibration: &CameraCalibration,
) -> Result<PoseEstimate, PnpError> {
    if model.len() != image.len() {
        return Err(PnpError::MismatchedCorrespondences {
            model: model.len(),
            image: image.len(),
        });
    }
    if model.len() < 4 {
        return Err(PnpError::InsufficientCorrespondences {
            required: 4,
            got: model.len(),
        });
    }

    let plane: Vec<Point2<f64>> = model.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let ideal = calibration.undistort_points(image);

    let h = estimate_homography(&plane, &ideal)?;
    decompose_homography(&h, calibration)
}

/// Normalized DLT homography estimate: `img ~ H * plane`.
fn estimate_homography(
    plane: &[Point2<f64>],
    image: &[Point2<f64>],
) -> Result<Matrix3<f64>, PnpError> {
    let (pn, t_plane) = hartley_normalize(plane).ok_or(PnpError::Degenerate)?;
    let (inorm, t_img) = hartley_normalize(image).ok_or(PnpError::Degenerate)?;

    let n = plane.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let (x, y) = (pn[k].x, pn[k].y);
        let (u, v) = (inorm[k].x, inorm[k].y);

        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Null vector of A: the right singular vector of the smallest
    // singular value.
    let svd = a.svd(true, true);
    let vt = svd.v_t.ok_or(PnpError::SvdFailed)?;
    let h = vt.row(vt.nrows() - 1);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // Denormalize: H = T_img⁻¹ · Hn · T_plane.
    let t_img_inv = t_img.try_inverse().ok_or(PnpError::Degenerate)?;
    Ok(t_img_inv * hn * t_plane)
}

fn hartley_normalize(pts: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / n;

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= 1e-12 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((out, t))
}

/// Classic plane-induced decomposition: `K⁻¹H = [r1 r2 t]` up to scale,
/// with the scale fixed by the unit rotation columns and the sign by the
/// target sitting in front of the camera.
fn decompose_homography(
    h: &Matrix3<f64>,
    calibration: &CameraCalibration,
) -> Result<PoseEstimate, PnpError> {
    let a = calibration.camera_matrix_inv * h;

    let norm1 = a.column(0).norm();
    let norm2 = a.column(1).norm();
    if norm1 <= 1e-12 || norm2 <= 1e-12 {
        return Err(PnpError::Degenerate);
    }
    let lambda = 2.0 / (norm1 + norm2);

    let mut r1 = a.column(0) * lambda;
    let mut r2 = a.column(1) * lambda;
    let mut t = a.column(2) * lambda;
    if t.z < 0.0 {
        // The homography's overall sign is arbitrary out of the SVD.
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);

    let mut r_mat = Matrix3::zeros();
    r_mat.set_column(0, &r1);
    r_mat.set_column(1, &r2);
    r_mat.set_column(2, &r3);

    // Project onto SO(3) (polar decomposition via SVD).
    let svd = r_mat.svd(true, true);
    let u = svd.u.ok_or(PnpError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PnpError::SvdFailed)?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let rvec = Rotation3::from_matrix_unchecked(r_orth).scaled_axis();
    Ok(PoseEstimate {
        rvec,
        tvec: Vector3::new(t.x, t.y, t.z),
    })
}
