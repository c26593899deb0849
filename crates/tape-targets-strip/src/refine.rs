//! Coarse key-point extraction and sub-pixel corner refinement.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tape_targets_core::{sample_bilinear, BinaryImageView};

/// Sub-pixel search settings. The stopping rule is the usual one for
/// corner refinement: stop when the update falls below `epsilon` or after
/// `max_iterations`, whichever comes first.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RefineParams {
    /// Half-size of the square search window, pixels.
    pub half_window: u32,
    pub max_iterations: usize,
    /// Convergence threshold on the per-iteration shift, pixels.
    pub epsilon: f64,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iterations: 30,
            epsilon: 1e-3,
        }
    }
}

/// The four key corners of a strip pair, ordered left-to-right: the two
/// per-strip top points, then the outermost points of the pair.
#[derive(Clone, Copy, Debug)]
pub struct StripCorners {
    pub top_left: Point2<f64>,
    pub top_right: Point2<f64>,
    pub outer_left: Point2<f64>,
    pub outer_right: Point2<f64>,
}

impl StripCorners {
    pub fn as_array(&self) -> [Point2<f64>; 4] {
        [self.top_left, self.top_right, self.outer_left, self.outer_right]
    }
}

/// Coarse corners of a contour pair: each contour's topmost point (the
/// two ordered left-to-right) plus the leftmost and rightmost points
/// across the pair. Returns `None` when either contour is empty.
pub fn coarse_corners(left: &[Point2<f64>], right: &[Point2<f64>]) -> Option<StripCorners> {
    let top_a = extreme(left, |p| -p.y)?;
    let top_b = extreme(right, |p| -p.y)?;
    let (top_left, top_right) = if top_a.x <= top_b.x {
        (top_a, top_b)
    } else {
        (top_b, top_a)
    };

    let left_a = extreme(left, |p| -p.x)?;
    let left_b = extreme(right, |p| -p.x)?;
    let outer_left = if left_a.x <= left_b.x { left_a } else { left_b };

    let right_a = extreme(left, |p| p.x)?;
    let right_b = extreme(right, |p| p.x)?;
    let outer_right = if right_a.x >= right_b.x { right_a } else { right_b };

    Some(StripCorners {
        top_left,
        top_right,
        outer_left,
        outer_right,
    })
}

fn extreme(points: &[Point2<f64>], score: impl Fn(&Point2<f64>) -> f64) -> Option<Point2<f64>> {
    points
        .iter()
        .copied()
        .max_by(|a, b| score(a).total_cmp(&score(b)))
}

/// Refine all four corners against the closed binary mask.
pub fn refine_corners(
    mask: &BinaryImageView<'_>,
    corners: &StripCorners,
    params: &RefineParams,
) -> StripCorners {
    StripCorners {
        top_left: refine_corner(mask, corners.top_left, params),
        top_right: refine_corner(mask, corners.top_right, params),
        outer_left: refine_corner(mask, corners.outer_left, params),
        outer_right: refine_corner(mask, corners.outer_right, params),
    }
}

/// Gradient structure-tensor iteration: solve `(Σ g gᵀ) p = Σ (g gᵀ) q`
/// over the window, which places `p` at the least-squares intersection of
/// the local edges. Degrades gracefully: flat or one-edge windows and
/// non-convergence all return the best estimate so far.
pub fn refine_corner(
    mask: &BinaryImageView<'_>,
    start: Point2<f64>,
    params: &RefineParams,
) -> Point2<f64> {
    let half = params.half_window as i64;
    let mut p = start;

    for _ in 0..params.max_iterations {
        let mut gxx = 0.0f64;
        let mut gxy = 0.0f64;
        let mut gyy = 0.0f64;
        let mut bx = 0.0f64;
        let mut by = 0.0f64;

        for dy in -half..=half {
            for dx in -half..=half {
                let qx = p.x + dx as f64;
                let qy = p.y + dy as f64;
                let gx = (sample_bilinear(mask, qx + 1.0, qy)
                    - sample_bilinear(mask, qx - 1.0, qy))
                    / 510.0;
                let gy = (sample_bilinear(mask, qx, qy + 1.0)
                    - sample_bilinear(mask, qx, qy - 1.0))
                    / 510.0;
                gxx += gx * gx;
                gxy += gx * gy;
                gyy += gy * gy;
                bx += gx * gx * qx + gx * gy * qy;
                by += gx * gy * qx + gy * gy * qy;
            }
        }

        let det = gxx * gyy - gxy * gxy;
        let trace = gxx + gyy;
        // A window seeing zero or one edge direction has no unique
        // solution; keep the current estimate.
        if det <= 1e-8 * trace * trace {
            break;
        }

        let nx = (gyy * bx - gxy * by) / det;
        let ny = (gxx * by - gxy * bx) / det;
        let shift = ((nx - p.x).powi(2) + (ny - p.y).powi(2)).sqrt();
        if shift > half as f64 {
            break; // ill-conditioned step, keep the last good estimate
        }
        p = Point2::new(nx, ny);
        if shift < params.epsilon {
            break;
        }
    }

    p
}
