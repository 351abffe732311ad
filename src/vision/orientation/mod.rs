//! Object orientation estimation. Two interchangeable implementations of
//! the same capability; the coordinator depends only on the trait, so the
//! algorithm can be swapped without touching the state machine.

mod moments;
mod rect_fit;

pub use moments::MomentEstimator;
pub use rect_fit::RectFitEstimator;

use crate::common::{BoundingBox, Frame};
use crate::pipeline::types::AngleResult;

/// Minimum foreground mass below which a crop is judged degenerate.
const MIN_FOREGROUND_PIXELS: usize = 32;

pub trait OrientationEstimator: Send + Sync {
    /// Estimate the principal-axis angle of the object inside `bbox`,
    /// degrees in [-90, +90], 0 = horizontal. `valid = false` when the
    /// orientation cannot be determined (insufficient contour, degenerate
    /// shape); callers treat that as "grip straight", not as a fault.
    fn estimate(&self, frame: &Frame, bbox: &BoundingBox) -> AngleResult;

    fn name(&self) -> &'static str;
}

/// Foreground pixel coordinates of the bbox crop, in crop-local space.
/// Foreground = darker than the Otsu split (objects sit dark on the
/// light conveyor belt).
fn foreground_points(frame: &Frame, bbox: &BoundingBox) -> Vec<(f64, f64)> {
    let x1 = bbox.x1.max(0.0) as u32;
    let y1 = bbox.y1.max(0.0) as u32;
    let x2 = (bbox.x2.min(frame.width() as f32)).max(0.0) as u32;
    let y2 = (bbox.y2.min(frame.height() as f32)).max(0.0) as u32;
    if x2 <= x1 || y2 <= y1 {
        return Vec::new();
    }

    let crop = frame.image().crop_imm(x1, y1, x2 - x1, y2 - y1).to_luma8();
    let threshold = otsu_threshold(&crop);
    let mut points = Vec::new();
    for (x, y, pixel) in crop.enumerate_pixels() {
        if pixel[0] < threshold {
            points.push((x as f64, y as f64));
        }
    }
    points
}

fn otsu_threshold(gray: &image::GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 128;
    }
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(v, &count)| v as f64 * count as f64)
        .sum();

    let mut best_threshold = 128u8;
    let mut best_variance = 0.0f64;
    let mut weight_bg = 0u64;
    let mut sum_bg = 0.0f64;
    for value in 0..256usize {
        weight_bg += histogram[value];
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += value as f64 * histogram[value] as f64;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let variance =
            weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg) * (mean_bg - mean_fg);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = value as u8;
        }
    }
    best_threshold.saturating_add(1)
}

/// Fold an arbitrary axis angle into [-90, +90].
fn normalize_degrees(mut angle: f64) -> f64 {
    while angle > 90.0 {
        angle -= 180.0;
    }
    while angle < -90.0 {
        angle += 180.0;
    }
    angle
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use image::{DynamicImage, GrayImage, Luma};

    use crate::common::Frame;

    /// White 96x96 frame with dark pixels wherever `ink` says so.
    pub fn frame_with_ink(ink: impl Fn(u32, u32) -> bool) -> Frame {
        let mut gray = GrayImage::from_pixel(96, 96, Luma([230u8]));
        for y in 0..96 {
            for x in 0..96 {
                if ink(x, y) {
                    gray.put_pixel(x, y, Luma([20u8]));
                }
            }
        }
        Frame::new(0, DynamicImage::ImageLuma8(gray), Utc::now())
    }
}
