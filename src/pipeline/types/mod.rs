mod angle;
mod category;
mod motion;
mod session;
mod status;

pub use angle::AngleResult;
pub use category::{CategoryMap, CategoryProfile, RotationMode, SortBin};
pub use motion::{
    FineTuneOffset, MotionSequence, MotionStep, MotionTemplate, SERVO_COUNT, SERVO_RANGE_MAX,
};
pub use session::PickSession;
pub use status::{PickState, PickStatus};
