//! Camera calibration handling and the perspective pose solve.
//!
//! The solve maps the 8-point target model onto 8 refined image points
//! under known intrinsics/distortion. The model is coplanar, so the
//! estimate goes through a plane-induced homography rather than a general
//! 3D resection.

mod calibration;
mod euler;
mod pnp;

pub use calibration::{
    CalibrationError, CalibrationFile, CalibrationStore, CameraCalibration, Distortion,
};
pub use euler::{euler_from_rotation, rotation_from_rvec, EulerAngles};
pub use pnp::{solve_planar_pnp, PnpError, PoseEstimate};
