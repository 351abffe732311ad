use serde::{Deserialize, Serialize};

use super::SortBin;

/// Channel count of the arm. Servo ids in configuration are 1-based,
/// positions arrays are 0-based.
pub const SERVO_COUNT: usize = 6;

/// Hard safe range of a servo position. Every arithmetic step clamps into
/// this range before the value can reach hardware.
pub const SERVO_RANGE_MAX: u16 = 1000;

/// Servo corrections derived from the target's pixel offset to the frame
/// center. Zero on an axis means the offset was inside that axis' deadzone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FineTuneOffset {
    pub horizontal: i32,
    pub vertical: i32,
}

impl FineTuneOffset {
    pub fn is_zero(&self) -> bool {
        self.horizontal == 0 && self.vertical == 0
    }
}

/// One arm pose: target position per servo channel plus the time the move
/// is given to complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionStep {
    pub positions: [u16; SERVO_COUNT],
    pub duration_ms: u64,
}

impl MotionStep {
    pub fn new(positions: [u16; SERVO_COUNT], duration_ms: u64) -> Self {
        Self {
            positions,
            duration_ms,
        }
    }
}

/// Base hand-authored trajectory for one sort bin, plus the step indices
/// eligible for rotation and fine-tune overwrites. Never mutated at pick
/// time; sequence builds copy it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionTemplate {
    pub steps: Vec<MotionStep>,
    pub rotation_steps: Vec<usize>,
    pub fine_tune_steps: Vec<usize>,
}

/// A concrete, fully parameterized trajectory for one pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionSequence {
    pub bin: SortBin,
    pub steps: Vec<MotionStep>,
}

impl MotionSequence {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
