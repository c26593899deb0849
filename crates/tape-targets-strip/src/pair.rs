//! Adjacent-contour pairing into target candidates.

use log::debug;
use serde::{Deserialize, Serialize};
use tape_targets_core::{min_area_rect, Contour, ContourRect};

/// Empirically tuned descriptor-angle windows, degrees, in the `[-90, 0)`
/// image-rectangle convention. Each window is exclusive at its low edge
/// and inclusive at its high edge. These are configuration, not derived
/// values: recalibrate them against the real optical setup.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PairParams {
    /// Accepted angle window for the left strip's descriptor.
    pub left_angle_deg: (f64, f64),
    /// Accepted angle window for the right strip's descriptor. Disjoint
    /// from the left window.
    pub right_angle_deg: (f64, f64),
}

impl Default for PairParams {
    fn default() -> Self {
        Self {
            left_angle_deg: (-80.0, -40.0),
            right_angle_deg: (-40.0, -10.0),
        }
    }
}

impl PairParams {
    #[inline]
    fn matches_left(&self, angle_deg: f64) -> bool {
        self.left_angle_deg.0 < angle_deg && angle_deg <= self.left_angle_deg.1
    }

    #[inline]
    fn matches_right(&self, angle_deg: f64) -> bool {
        self.right_angle_deg.0 < angle_deg && angle_deg <= self.right_angle_deg.1
    }
}

/// Two descriptors judged to be the left/right strips of one target.
///
/// A candidate, not a confirmed detection: it still has to survive corner
/// refinement and the pose solve.
#[derive(Clone, Debug)]
pub struct TargetCandidate {
    /// Index of the left strip's contour in the input list.
    pub left_contour: usize,
    /// Index of the right strip's contour in the input list.
    pub right_contour: usize,
    pub left_rect: ContourRect,
    pub right_rect: ContourRect,
}

impl TargetCandidate {
    /// Mean of the two descriptor centers, used to key telemetry/overlay.
    pub fn center(&self) -> nalgebra::Point2<f64> {
        nalgebra::center(&self.left_rect.center, &self.right_rect.center)
    }
}

/// Compute descriptors for every non-degenerate contour and sort them by
/// ascending center x (left-to-right in image space). The returned pairs
/// keep each contour's index in the input list.
pub fn descriptors(contours: &[Contour]) -> Vec<(usize, ContourRect)> {
    let mut rects: Vec<(usize, ContourRect)> = contours
        .iter()
        .enumerate()
        .filter_map(|(i, c)| min_area_rect(c).map(|r| (i, r)))
        .collect();
    rects.sort_by(|a, b| a.1.center.x.total_cmp(&b.1.center.x));
    rects
}

/// Pair immediately adjacent descriptors whose angles land in the left
/// and right windows. Non-adjacent combinations are never paired, and a
/// descriptor with no valid neighbor stays unmatched.
pub fn pair_descriptors(sorted: &[(usize, ContourRect)], params: &PairParams) -> Vec<TargetCandidate> {
    let mut candidates = Vec::new();
    for window in sorted.windows(2) {
        let (left_idx, left_rect) = window[0];
        let (right_idx, right_rect) = window[1];
        debug!(
            "pair test: angles {:.1} / {:.1}",
            left_rect.angle_deg, right_rect.angle_deg
        );
        if params.matches_left(left_rect.angle_deg) && params.matches_right(right_rect.angle_deg) {
            candidates.push(TargetCandidate {
                left_contour: left_idx,
                right_contour: right_idx,
                left_rect,
                right_rect,
            });
        }
    }
    candidates
}

/// Convenience wrapper: descriptors + pairing in one call.
///
/// Fewer than 2 usable contours produce an empty list, never an error.
pub fn select_candidates(contours: &[Contour], params: &PairParams) -> Vec<TargetCandidate> {
    pair_descriptors(&descriptors(contours), params)
}
