use tracing::debug;

use crate::config::{FineTuneConfig, RotationConfig};
use crate::pipeline::geometry::{angle_to_rotation_servo, clamp_servo};
use crate::pipeline::types::{
    AngleResult, CategoryProfile, FineTuneOffset, MotionSequence, MotionTemplate, RotationMode,
};

/// Specializes a bin's base template into a concrete trajectory for one
/// pick. Templates are borrowed read-only; every build deep-copies, so two
/// concurrent builds can never interfere and the template survives intact.
pub struct SequenceBuilder {
    rotation: RotationConfig,
    fine_tune: FineTuneConfig,
}

impl SequenceBuilder {
    pub fn new(rotation: RotationConfig, fine_tune: FineTuneConfig) -> Self {
        Self {
            rotation,
            fine_tune,
        }
    }

    pub fn build(
        &self,
        template: &MotionTemplate,
        profile: &CategoryProfile,
        angle: &AngleResult,
        offset: &FineTuneOffset,
    ) -> MotionSequence {
        let mut steps = template.steps.clone();

        let rotation_value = match profile.rotation {
            RotationMode::Fixed => clamp_servo(profile.fixed_rotation as i64),
            RotationMode::AngleAware => {
                if angle.valid {
                    angle_to_rotation_servo(angle.degrees, &self.rotation)
                } else {
                    // orientation undeterminable: grip straight
                    self.rotation.neutral
                }
            }
        };

        let rotation_channel = (self.rotation.servo_id - 1) as usize;
        for &index in &template.rotation_steps {
            if let Some(step) = steps.get_mut(index) {
                step.positions[rotation_channel] = rotation_value;
            }
        }
        debug!(
            rotation = rotation_value,
            mode = ?profile.rotation,
            "Rotation applied to sequence"
        );

        if self.fine_tune.enabled && !offset.is_zero() {
            let h_channel = (self.fine_tune.horizontal.servo_id - 1) as usize;
            let v_channel = (self.fine_tune.vertical.servo_id - 1) as usize;
            let h_value =
                clamp_servo(self.fine_tune.horizontal.neutral as i64 + offset.horizontal as i64);
            let v_value =
                clamp_servo(self.fine_tune.vertical.neutral as i64 + offset.vertical as i64);
            for &index in &template.fine_tune_steps {
                if let Some(step) = steps.get_mut(index) {
                    if offset.horizontal != 0 {
                        step.positions[h_channel] = h_value;
                    }
                    if offset.vertical != 0 {
                        step.positions[v_channel] = v_value;
                    }
                }
            }
            debug!(
                horizontal = offset.horizontal,
                vertical = offset.vertical,
                "Fine-tune applied to sequence"
            );
        }

        MotionSequence {
            bin: profile.bin,
            steps,
        }
    }
}
