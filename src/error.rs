use thiserror::Error;

// Main application error type

#[derive(Error, Debug)]
pub enum SortError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Conveyor error: {0}")]
    Conveyor(#[from] ConveyorError),
    #[error("Arm error: {0}")]
    Arm(#[from] ArmError),
    #[error("Detector error: {0}")]
    Detect(#[from] DetectError),
    #[error("Coordinator error: {0}")]
    Coordinator(String),
}

// Startup-time configuration faults. Every variant is fatal before the
// coordinator enters IDLE; none of these can occur mid-pick.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Servo id {0} is outside the valid channel range 1..={1}")]
    ServoChannel(u8, usize),
    #[error("Rotation range is invalid: min {min} < neutral {neutral} < max {max} required")]
    RotationRange { min: u16, neutral: u16, max: u16 },
    #[error("Angle adjust range is invalid: [{0}, {1}]")]
    AdjustRange(f64, f64),
    #[error("Motion template for the {0} bin is empty")]
    EmptyTemplate(&'static str),
    #[error("Step index {index} is out of range for the {bin} template of {len} steps")]
    StepIndex {
        bin: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Confidence threshold {0} is outside [0, 1]")]
    ConfidenceThreshold(f32),
    #[error("Stability frame count must be at least 1")]
    StabilityCount,
    #[error("Servo position {0} exceeds the safe range 0..={1}")]
    ServoPosition(u16, u16),
    #[error("No categories configured")]
    NoCategories,
}

#[derive(Error, Debug)]
pub enum ConveyorError {
    #[error("I/O error talking to the plug: {0}")]
    Io(#[from] std::io::Error),
    #[error("Plug command timed out after {0} ms")]
    Timeout(u64),
    #[error("Malformed plug response: {0}")]
    Protocol(String),
    #[error("Plug refused command: error code {0}")]
    Refused(i64),
}

#[derive(Error, Debug)]
pub enum ArmError {
    #[error("Arm rejected step: {0}")]
    Rejected(String),
    #[error("Arm is disconnected")]
    Disconnected,
    #[error("I/O error talking to the arm: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Detector is unavailable")]
    Unavailable,
}
