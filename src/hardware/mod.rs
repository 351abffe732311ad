mod arm;
pub mod conveyor;

pub use arm::{ArmDriver, SimulatedArm};
pub use conveyor::{ConveyorSwitch, KasaPlug};
