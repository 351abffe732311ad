mod detection;
mod frame;

pub use detection::{BoundingBox, Detection};
pub use frame::Frame;
