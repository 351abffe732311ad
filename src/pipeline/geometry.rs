//! Pure servo-space mappings. No state, no hardware; everything here is a
//! plain function so the coordinator stays trivially testable.

use crate::config::{FineTuneAxis, FineTuneConfig, RotationConfig};
use crate::pipeline::types::{FineTuneOffset, SERVO_RANGE_MAX};

/// Clamp a raw servo computation into the arm's safe range. Applied after
/// every arithmetic step, not only at the final output, so no transient
/// out-of-range value can reach hardware.
pub fn clamp_servo(value: i64) -> u16 {
    value.clamp(0, SERVO_RANGE_MAX as i64) as u16
}

/// Map an object orientation onto the gripper rotation servo.
///
/// Outside [adjust_min_deg, adjust_max_deg] the orientation is judged
/// unreliable or outside the safe grip range and the servo stays at
/// neutral. Inside, the angle maps piecewise-linearly with the neutral
/// pose anchored at 0 deg: -90 deg reaches `min`, +90 deg reaches `max`.
pub fn angle_to_rotation_servo(angle_deg: f64, cfg: &RotationConfig) -> u16 {
    if angle_deg < cfg.adjust_min_deg || angle_deg > cfg.adjust_max_deg {
        return cfg.neutral;
    }
    let angle = angle_deg.clamp(-90.0, 90.0);
    let ratio = angle / 90.0;
    let span = if angle >= 0.0 {
        (cfg.max - cfg.neutral) as f64
    } else {
        (cfg.neutral - cfg.min) as f64
    };
    let raw = cfg.neutral as f64 + span * ratio;
    let value = clamp_servo(raw.round() as i64);
    value.clamp(cfg.min, cfg.max)
}

fn axis_delta(offset_px: f64, axis: &FineTuneAxis) -> i32 {
    if offset_px.abs() < axis.deadzone_px {
        return 0;
    }
    let raw = (offset_px * axis.factor).round() as i64;
    let max = axis.max_delta as i64;
    raw.clamp(-max, max) as i32
}

/// Convert the target's pixel offset from frame center into per-axis servo
/// deltas. Each axis has its own factor, deadzone and maximum; the axes
/// drive independent servo channels.
pub fn pixel_offset_to_fine_tune(dx: f64, dy: f64, cfg: &FineTuneConfig) -> FineTuneOffset {
    if !cfg.enabled {
        return FineTuneOffset::default();
    }
    FineTuneOffset {
        horizontal: axis_delta(dx, &cfg.horizontal),
        vertical: axis_delta(dy, &cfg.vertical),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortConfig;

    fn rotation() -> RotationConfig {
        SortConfig::default().rotation
    }

    fn fine_tune() -> FineTuneConfig {
        SortConfig::default().fine_tune
    }

    #[test]
    fn neutral_outside_adjust_range() {
        let cfg = rotation();
        assert_eq!(angle_to_rotation_servo(-36.0, &cfg), cfg.neutral);
        assert_eq!(angle_to_rotation_servo(35.1, &cfg), cfg.neutral);
        assert_eq!(angle_to_rotation_servo(90.0, &cfg), cfg.neutral);
    }

    #[test]
    fn zero_angle_maps_to_neutral() {
        let cfg = rotation();
        assert_eq!(angle_to_rotation_servo(0.0, &cfg), cfg.neutral);
    }

    #[test]
    fn mapping_is_monotonic_within_adjust_range() {
        let cfg = rotation();
        let mut prev = None;
        let mut angle = cfg.adjust_min_deg;
        while angle <= cfg.adjust_max_deg {
            let value = angle_to_rotation_servo(angle, &cfg);
            if let Some(prev) = prev {
                assert!(value >= prev, "servo value decreased at {angle} deg");
            }
            prev = Some(value);
            angle += 0.5;
        }
    }

    #[test]
    fn mapping_is_idempotent() {
        let cfg = rotation();
        for angle in [-35.0, -10.0, 0.0, 12.5, 35.0] {
            assert_eq!(
                angle_to_rotation_servo(angle, &cfg),
                angle_to_rotation_servo(angle, &cfg)
            );
        }
    }

    #[test]
    fn output_stays_within_rotation_bounds() {
        let cfg = RotationConfig {
            adjust_min_deg: -90.0,
            adjust_max_deg: 90.0,
            ..rotation()
        };
        assert_eq!(angle_to_rotation_servo(-90.0, &cfg), cfg.min);
        assert_eq!(angle_to_rotation_servo(90.0, &cfg), cfg.max);
    }

    #[test]
    fn deadzone_zeroes_both_axes() {
        let cfg = fine_tune();
        let offset = pixel_offset_to_fine_tune(19.9, -19.9, &cfg);
        assert!(offset.is_zero());
    }

    #[test]
    fn delta_never_exceeds_axis_maximum() {
        let cfg = fine_tune();
        for dx in [-5000.0, -300.0, 300.0, 5000.0] {
            let offset = pixel_offset_to_fine_tune(dx, dx, &cfg);
            assert!(offset.horizontal.abs() as u16 <= cfg.horizontal.max_delta);
            assert!(offset.vertical.abs() as u16 <= cfg.vertical.max_delta);
        }
    }

    #[test]
    fn vertical_factor_sign_is_respected() {
        let cfg = fine_tune();
        // object below center, negative vertical factor: servo goes down
        let offset = pixel_offset_to_fine_tune(0.0, 100.0, &cfg);
        assert!(offset.vertical < 0);
        assert_eq!(offset.horizontal, 0);
    }

    #[test]
    fn disabled_fine_tuning_returns_zero() {
        let mut cfg = fine_tune();
        cfg.enabled = false;
        assert!(pixel_offset_to_fine_tune(500.0, 500.0, &cfg).is_zero());
    }

    #[test]
    fn clamp_servo_bounds() {
        assert_eq!(clamp_servo(-5), 0);
        assert_eq!(clamp_servo(1001), 1000);
        assert_eq!(clamp_servo(640), 640);
    }
}
