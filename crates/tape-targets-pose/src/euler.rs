//! Rodrigues vector and Euler-angle conversions.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Intrinsic x/y/z angles in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Expand a Rodrigues rotation vector into its 3×3 rotation matrix.
pub fn rotation_from_rvec(rvec: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(*rvec).into_inner()
}

/// Decompose a rotation matrix into Euler angles.
///
/// `sy = sqrt(R00² + R10²)` vanishes at gimbal lock (pitch = ±90°), where
/// yaw and roll become one degree of freedom; the singular branch pins
/// yaw to zero and solves the rest from the remaining entries. Without
/// that branch the decomposition is unstable near the singularity.
pub fn euler_from_rotation(r: &Matrix3<f64>) -> EulerAngles {
    let sy = (r[(0, 0)] * r[(0, 0)] + r[(1, 0)] * r[(1, 0)]).sqrt();

    if sy >= 1e-6 {
        EulerAngles {
            roll: r[(2, 1)].atan2(r[(2, 2)]),
            pitch: (-r[(2, 0)]).atan2(sy),
            yaw: r[(1, 0)].atan2(r[(0, 0)]),
        }
    } else {
        EulerAngles {
            roll: (-r[(1, 2)]).atan2(r[(1, 1)]),
            pitch: (-r[(2, 0)]).atan2(sy),
            yaw: 0.0,
        }
    }
}
