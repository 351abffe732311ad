use std::cmp::Ordering;

use crate::common::{Detection, Frame};
use crate::config::RoiConfig;
use crate::pipeline::types::CategoryMap;

/// The single candidate a frame boils down to, if any.
#[derive(Debug, Clone)]
pub struct Selection {
    pub detection: Detection,
    pub in_roi: bool,
}

/// Centered region of interest in pixel space for one frame size.
#[derive(Debug, Clone, Copy)]
struct RoiRect {
    x_min: f32,
    x_max: f32,
    y_min: f32,
    y_max: f32,
}

impl RoiRect {
    fn from_margins(frame: &Frame, roi: &RoiConfig) -> Self {
        let (cx, cy) = frame.center();
        let half_w = frame.width() as f32 * roi.margin_x / 2.0;
        let half_h = frame.height() as f32 * roi.margin_y / 2.0;
        Self {
            x_min: cx - half_w,
            x_max: cx + half_w,
            y_min: cy - half_h,
            y_max: cy + half_h,
        }
    }

    fn contains(&self, (x, y): (f32, f32)) -> bool {
        self.x_min <= x && x <= self.x_max && self.y_min <= y && y <= self.y_max
    }
}

/// Picks at most one detection per frame: whitelist and confidence filter,
/// then ROI-priority, then confidence with area and center-distance
/// tie-breaks.
pub struct TargetSelector {
    roi: RoiConfig,
    confidence_threshold: f32,
    categories: CategoryMap,
}

impl TargetSelector {
    pub fn new(roi: RoiConfig, confidence_threshold: f32, categories: CategoryMap) -> Self {
        Self {
            roi,
            confidence_threshold,
            categories,
        }
    }

    pub fn select(&self, frame: &Frame, detections: &[Detection]) -> Option<Selection> {
        let roi = RoiRect::from_margins(frame, &self.roi);
        let center = frame.center();

        let mut inside: Vec<&Detection> = Vec::new();
        let mut outside: Vec<&Detection> = Vec::new();
        for det in detections {
            if det.confidence < self.confidence_threshold {
                continue;
            }
            if !self.categories.contains(&det.label) {
                continue;
            }
            if roi.contains(det.center()) {
                inside.push(det);
            } else {
                outside.push(det);
            }
        }

        // Outside-ROI candidates are degraded targets: usable to warm up
        // the stability counter, selected only when nothing is inside.
        let (pool, in_roi) = if inside.is_empty() {
            (outside, false)
        } else {
            (inside, true)
        };

        let best = pool
            .into_iter()
            .max_by(|a, b| Self::rank(a, b, center))?
            .clone();
        Some(Selection {
            detection: best,
            in_roi,
        })
    }

    fn rank(a: &Detection, b: &Detection, center: (f32, f32)) -> Ordering {
        a.confidence
            .total_cmp(&b.confidence)
            .then_with(|| a.bbox.area().total_cmp(&b.bbox.area()))
            .then_with(|| {
                // closer to frame center wins, so compare inverted
                distance_sq(b.center(), center).total_cmp(&distance_sq(a.center(), center))
            })
    }
}

fn distance_sq((x, y): (f32, f32), (cx, cy): (f32, f32)) -> f32 {
    (x - cx) * (x - cx) + (y - cy) * (y - cy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BoundingBox;
    use crate::config::SortConfig;
    use chrono::Utc;
    use image::DynamicImage;

    fn frame() -> Frame {
        Frame::new(0, DynamicImage::new_rgb8(1000, 1000), Utc::now())
    }

    fn selector() -> TargetSelector {
        let cfg = SortConfig::default();
        TargetSelector::new(cfg.roi, cfg.confidence_threshold, cfg.categories)
    }

    fn det(label: &str, conf: f32, cx: f32, cy: f32, half: f32) -> Detection {
        Detection::new(
            label,
            conf,
            BoundingBox::new(cx - half, cy - half, cx + half, cy + half),
        )
    }

    #[test]
    fn no_candidates_yields_none() {
        assert!(selector().select(&frame(), &[]).is_none());
    }

    #[test]
    fn low_confidence_is_filtered() {
        let sel = selector().select(&frame(), &[det("plastic_bottle", 0.3, 500.0, 500.0, 40.0)]);
        assert!(sel.is_none());
    }

    #[test]
    fn non_whitelisted_label_is_filtered() {
        let sel = selector().select(&frame(), &[det("banana", 0.99, 500.0, 500.0, 40.0)]);
        assert!(sel.is_none());
    }

    #[test]
    fn roi_candidate_beats_higher_confidence_outsider() {
        // ROI is the centered 150x150 box for a 1000x1000 frame
        let inside = det("plastic_bottle", 0.6, 510.0, 490.0, 30.0);
        let outside = det("paper_cup", 0.95, 100.0, 100.0, 30.0);
        let sel = selector().select(&frame(), &[outside, inside]).unwrap();
        assert_eq!(sel.detection.label, "plastic_bottle");
        assert!(sel.in_roi);
    }

    #[test]
    fn falls_back_to_outside_candidate_when_roi_empty() {
        let outside = det("paper_cup", 0.95, 100.0, 100.0, 30.0);
        let sel = selector().select(&frame(), &[outside]).unwrap();
        assert_eq!(sel.detection.label, "paper_cup");
        assert!(!sel.in_roi);
    }

    #[test]
    fn confidence_breaks_within_pool() {
        let a = det("plastic_bottle", 0.7, 505.0, 505.0, 30.0);
        let b = det("glass_bottle", 0.8, 495.0, 495.0, 30.0);
        let sel = selector().select(&frame(), &[a, b]).unwrap();
        assert_eq!(sel.detection.label, "glass_bottle");
    }

    #[test]
    fn equal_confidence_falls_to_larger_area() {
        let small = det("plastic_bottle", 0.8, 505.0, 505.0, 20.0);
        let large = det("glass_bottle", 0.8, 495.0, 495.0, 35.0);
        let sel = selector().select(&frame(), &[small, large]).unwrap();
        assert_eq!(sel.detection.label, "glass_bottle");
    }

    #[test]
    fn equal_confidence_and_area_falls_to_center_distance() {
        let near = det("plastic_bottle", 0.8, 502.0, 502.0, 25.0);
        let far = det("glass_bottle", 0.8, 530.0, 530.0, 25.0);
        let sel = selector().select(&frame(), &[far, near]).unwrap();
        assert_eq!(sel.detection.label, "plastic_bottle");
    }
}
