//! Contours and minimum-area bounding rectangles.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Closed 2D point sequence bounding one segmented blob.
pub type Contour = Vec<Point2<f64>>;

/// Minimum-area rotated rectangle descriptor of a contour.
///
/// `angle_deg` follows the image-rectangle convention: the rectangle is
/// `width` long along the direction `angle_deg`, with the angle always in
/// `[-90, 0)`. `width`/`height` are therefore not sorted by magnitude.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ContourRect {
    pub center: Point2<f64>,
    pub width: f64,
    pub height: f64,
    pub angle_deg: f64,
}

impl ContourRect {
    /// The four rectangle corners, for overlay drawing.
    pub fn box_points(&self) -> [Point2<f64>; 4] {
        let phi = self.angle_deg.to_radians();
        let u = Vector2::new(phi.cos(), phi.sin()) * (self.width * 0.5);
        let v = Vector2::new(-phi.sin(), phi.cos()) * (self.height * 0.5);
        [
            self.center - u - v,
            self.center + u - v,
            self.center + u + v,
            self.center - u + v,
        ]
    }
}

/// Compute the minimum-area bounding rectangle of a point set.
///
/// Returns `None` for degenerate input (fewer than 3 distinct points, or
/// all points collinear): such contours carry no usable orientation.
pub fn min_area_rect(points: &[Point2<f64>]) -> Option<ContourRect> {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return None;
    }

    let mut best: Option<(f64, f64, ContourRect)> = None;
    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let dir = (b.y - a.y).atan2(b.x - a.x);
        // Edge direction modulo 90°: the candidate axes of the rectangle.
        let a1 = dir.rem_euclid(std::f64::consts::FRAC_PI_2);
        let u = Vector2::new(a1.cos(), a1.sin());
        let v = Vector2::new(-a1.sin(), a1.cos());

        let mut min_u = f64::INFINITY;
        let mut max_u = f64::NEG_INFINITY;
        let mut min_v = f64::INFINITY;
        let mut max_v = f64::NEG_INFINITY;
        for p in &hull {
            let pu = p.coords.dot(&u);
            let pv = p.coords.dot(&v);
            min_u = min_u.min(pu);
            max_u = max_u.max(pu);
            min_v = min_v.min(pv);
            max_v = max_v.max(pv);
        }

        let eu = max_u - min_u;
        let ev = max_v - min_v;
        let area = eu * ev;
        if best.as_ref().is_none_or(|(best_area, _, _)| area < *best_area) {
            let mid = u * (0.5 * (min_u + max_u)) + v * (0.5 * (min_v + max_v));
            let rect = ContourRect {
                center: Point2::from(mid),
                // Width runs along a1 - 90°, i.e. the v axis.
                width: ev,
                height: eu,
                angle_deg: a1.to_degrees() - 90.0,
            };
            best = Some((area, eu.min(ev), rect));
        }
    }

    let (_, thickness, rect) = best?;
    if thickness <= f64::EPSILON {
        return None; // collinear input
    }
    Some(rect)
}

/// Andrew's monotone chain convex hull, counter-clockwise in a y-down
/// image frame.
fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut pts: Vec<Point2<f64>> = points.to_vec();
    pts.sort_by(|a, b| (a.x, a.y).partial_cmp(&(b.x, b.y)).unwrap());
    pts.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point2<f64>> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2<f64>> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    // Endpoints are shared between the chains.
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
