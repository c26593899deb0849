//! Physical target geometry.
//!
//! The target is two strips of retro-reflective tape tilted toward each
//! other, mirrored about the vertical centerline. The pose solve consumes
//! an 8-point correspondence list, so the point ordering produced here is
//! a hard contract shared with [`expand_image_corners`]: changing one
//! without the other silently breaks every range estimate.

use nalgebra::{center, Point2, Point3};
use serde::{Deserialize, Serialize};

/// Physical dimensions of one tape strip and its placement, inches and
/// degrees. Fixed at process start.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StripConstants {
    /// Width of a tape strip.
    pub strip_width: f64,
    /// Length of a tape strip.
    pub strip_length: f64,
    /// Horizontal distance from the target centerline to the inner top
    /// corner of either strip.
    pub corner_offset: f64,
    /// Tilt of each strip away from vertical.
    pub rotation_deg: f64,
}

impl Default for StripConstants {
    fn default() -> Self {
        Self {
            strip_width: 2.0,
            strip_length: 5.5,
            corner_offset: 4.0,
            rotation_deg: 14.5,
        }
    }
}

/// Canonical 3D coordinates of the target in its own frame (origin on the
/// centerline at the inner-corner height, z = 0 on the tape plane).
#[derive(Clone, Debug)]
pub struct TargetModel {
    left_strip: [Point3<f64>; 4],
    right_strip: [Point3<f64>; 4],
    points: [Point3<f64>; 8],
}

impl TargetModel {
    /// Build the model from physical constants. Deterministic.
    pub fn build(constants: &StripConstants) -> Self {
        let (sina, cosa) = constants.rotation_deg.to_radians().sin_cos();

        // Walk the right strip quadrilateral: inner top corner, outer top
        // corner, outer bottom corner, inner bottom corner.
        let mut pt = Point3::new(constants.corner_offset, 0.0, 0.0);
        let mut right = [pt; 4];
        pt.x += constants.strip_width * cosa;
        pt.y += constants.strip_width * sina;
        right[1] = pt;
        pt.x += constants.strip_length * sina;
        pt.y -= constants.strip_length * cosa;
        right[2] = pt;
        pt.x -= constants.strip_width * cosa;
        pt.y -= constants.strip_width * sina;
        right[3] = pt;

        let left = right.map(|p| Point3::new(-p.x, p.y, p.z));

        let points = [
            left[2],
            left[1],
            center(&left[2], &left[1]),
            center(&left[1], &right[1]),
            center(&left[2], &right[2]),
            center(&right[2], &right[1]),
            right[1],
            right[2],
        ];

        Self {
            left_strip: left,
            right_strip: right,
            points,
        }
    }

    /// The 8 correspondence points, in solve order: left outer-bottom,
    /// left outer-top, left-strip average, across-top average, across-
    /// bottom average, right-strip average, right outer-top, right
    /// outer-bottom.
    #[inline]
    pub fn points(&self) -> &[Point3<f64>; 8] {
        &self.points
    }

    #[inline]
    pub fn left_strip(&self) -> &[Point3<f64>; 4] {
        &self.left_strip
    }

    #[inline]
    pub fn right_strip(&self) -> &[Point3<f64>; 4] {
        &self.right_strip
    }
}

/// Expand the 4 refined image corners to the 8-point correspondence list,
/// by the same averaging that builds [`TargetModel::points`].
pub fn expand_image_corners(corners: &crate::StripCorners) -> [Point2<f64>; 8] {
    let tl = corners.top_left;
    let tr = corners.top_right;
    let ol = corners.outer_left;
    let or = corners.outer_right;
    [
        ol,
        tl,
        center(&tl, &ol),
        center(&tl, &tr),
        center(&ol, &or),
        center(&tr, &or),
        tr,
        or,
    ]
}
