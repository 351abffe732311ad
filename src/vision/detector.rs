use async_trait::async_trait;

use crate::common::{Detection, Frame};
use crate::error::DetectError;

/// The external detection model, seen from the coordinator: one set of
/// boxes per frame, possibly empty, no cross-frame guarantees beyond the
/// frame's monotonic index.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectError>;

    fn name(&self) -> &'static str;
}

/// Stand-in detector returning the same configured detections every frame.
/// Lets a rig be commissioned (conveyor, arm, timing) with no model
/// attached; with an empty list the coordinator simply idles.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detections: Vec<Detection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Detector for StaticDetector {
    async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        Ok(self.detections.clone())
    }

    fn name(&self) -> &'static str {
        "StaticDetector"
    }
}
