use tracing::debug;

use crate::common::{BoundingBox, Frame};
use crate::pipeline::types::AngleResult;

use super::{foreground_points, normalize_degrees, OrientationEstimator, MIN_FOREGROUND_PIXELS};

/// Principal-axis estimator based on second-order central moments of the
/// foreground mask. Robust for blobby objects; cheap.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentEstimator;

impl MomentEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl OrientationEstimator for MomentEstimator {
    fn estimate(&self, frame: &Frame, bbox: &BoundingBox) -> AngleResult {
        let points = foreground_points(frame, bbox);
        if points.len() < MIN_FOREGROUND_PIXELS {
            debug!(
                foreground = points.len(),
                "Moment estimate skipped: insufficient foreground"
            );
            return AngleResult::invalid();
        }

        let n = points.len() as f64;
        let (sum_x, sum_y) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
        let (cx, cy) = (sum_x / n, sum_y / n);

        let (mut mu20, mut mu02, mut mu11) = (0.0f64, 0.0f64, 0.0f64);
        for &(x, y) in &points {
            let dx = x - cx;
            let dy = y - cy;
            mu20 += dx * dx;
            mu02 += dy * dy;
            mu11 += dx * dy;
        }

        // Isotropic mass distribution has no principal axis.
        if mu11.abs() < f64::EPSILON && (mu20 - mu02).abs() < f64::EPSILON {
            return AngleResult::invalid();
        }

        let angle = 0.5 * (2.0 * mu11).atan2(mu20 - mu02);
        AngleResult::valid(normalize_degrees(angle.to_degrees()))
    }

    fn name(&self) -> &'static str {
        "MomentEstimator"
    }
}
