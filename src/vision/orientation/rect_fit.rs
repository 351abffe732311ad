use tracing::debug;

use crate::common::{BoundingBox, Frame};
use crate::pipeline::types::AngleResult;

use super::{foreground_points, normalize_degrees, OrientationEstimator, MIN_FOREGROUND_PIXELS};

/// Minimum-area-rectangle estimator: convex hull of the foreground mask,
/// rotating calipers over the hull edges, long-side angle of the smallest
/// rectangle. The alternative to [`super::MomentEstimator`] for elongated
/// rigid objects such as bottles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectFitEstimator;

impl RectFitEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl OrientationEstimator for RectFitEstimator {
    fn estimate(&self, frame: &Frame, bbox: &BoundingBox) -> AngleResult {
        let points = foreground_points(frame, bbox);
        if points.len() < MIN_FOREGROUND_PIXELS {
            debug!(
                foreground = points.len(),
                "Rect-fit estimate skipped: insufficient foreground"
            );
            return AngleResult::invalid();
        }

        let hull = convex_hull(points);
        if hull.len() < 3 {
            return AngleResult::invalid();
        }

        match min_area_rect_angle(&hull) {
            Some(angle) => AngleResult::valid(normalize_degrees(angle)),
            None => AngleResult::invalid(),
        }
    }

    fn name(&self) -> &'static str {
        "RectFitEstimator"
    }
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Andrew monotone chain, counterclockwise hull without collinear points.
fn convex_hull(mut points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let mut hull: Vec<(f64, f64)> = Vec::with_capacity(points.len() * 2);
    for &p in points.iter().chain(points.iter().rev().skip(1)) {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Long-side angle (degrees) of the minimum-area rectangle enclosing the
/// hull. One caliper orientation per hull edge suffices.
fn min_area_rect_angle(hull: &[(f64, f64)]) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None; // (area, long-axis degrees)

    for i in 0..hull.len() {
        let (x1, y1) = hull[i];
        let (x2, y2) = hull[(i + 1) % hull.len()];
        let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        if len < f64::EPSILON {
            continue;
        }
        let ux = (x2 - x1) / len;
        let uy = (y2 - y1) / len;

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in hull {
            let u = x * ux + y * uy;
            let v = -x * uy + y * ux;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let width = max_u - min_u;
        let height = max_v - min_v;
        let area = width * height;
        let long_axis_deg = if width >= height {
            uy.atan2(ux).to_degrees()
        } else {
            ux.atan2(-uy).to_degrees()
        };

        if best.map(|(a, _)| area < a).unwrap_or(true) {
            best = Some((area, long_axis_deg));
        }
    }

    best.map(|(_, angle)| angle)
}
