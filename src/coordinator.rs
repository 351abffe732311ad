use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::common::Frame;
use crate::config::SortConfig;
use crate::error::SortError;
use crate::hardware::{ArmDriver, ConveyorSwitch};
use crate::intake::SyntheticCamera;
use crate::pipeline::types::PickStatus;
use crate::pipeline::PickCoordinator;
use crate::vision::{Detector, OrientationEstimator};

/// Owns the running tasks: the frame source and the frame-processing loop
/// that drives the pick coordinator. Exactly one frame is in flight at a
/// time; the camera may race ahead but its frames queue (and drop) rather
/// than fork the decision loop.
pub struct Coordinator {
    intake_task: tokio::task::JoinHandle<()>,
    pipeline_task: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
    status_rx: watch::Receiver<PickStatus>,
}

impl Coordinator {
    fn new(
        config: SortConfig,
        picker: PickCoordinator,
        detector: Arc<dyn Detector>,
        frame_buffer_size: usize,
        cancel_token: CancellationToken,
    ) -> Self {
        let status_rx = picker.status_watch();
        info!(detector = detector.name(), frame_buffer_size, "Starting tasks");
        let (frame_tx, frame_rx) = tokio::sync::mpsc::channel(frame_buffer_size);
        let intake_task =
            SyntheticCamera::new(config.intake, frame_tx).spawn(cancel_token.clone());
        let pipeline_task =
            Self::start_pipeline_task(picker, detector, frame_rx, cancel_token.clone());
        Self {
            intake_task,
            pipeline_task,
            cancel_token,
            status_rx,
        }
    }

    fn start_pipeline_task(
        mut picker: PickCoordinator,
        detector: Arc<dyn Detector>,
        mut frame_rx: Receiver<Frame>,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        info!("Pipeline task stopping");
                        break;
                    }
                    maybe_frame = frame_rx.recv() => {
                        let Some(frame) = maybe_frame else {
                            info!("Frame channel closed, pipeline task stopping");
                            break;
                        };
                        let detections = match detector.detect(&frame).await {
                            Ok(detections) => detections,
                            Err(e) => {
                                warn!("Detector error, frame skipped: {e}");
                                continue;
                            }
                        };
                        if let Err(e) = picker.process_frame(&frame, &detections).await {
                            error!("Pipeline error: {e}");
                        }
                    }
                }
            }
        })
    }

    /// Request shutdown. A pick in flight finishes at its next step
    /// boundary and the conveyor is force-resumed before the task exits.
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    pub fn status_watch(&self) -> watch::Receiver<PickStatus> {
        self.status_rx.clone()
    }

    /// Wait for both tasks to drain after `stop`.
    pub async fn join(mut self) {
        let _ = (&mut self.intake_task).await;
        let _ = (&mut self.pipeline_task).await;
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self.intake_task.abort();
        self.pipeline_task.abort();
    }
}

pub struct CoordinatorBuilder {
    config: SortConfig,
    frame_buffer_size: usize,
    detector: Option<Arc<dyn Detector>>,
    orientation: Option<Arc<dyn OrientationEstimator>>,
    arm: Option<Arc<dyn ArmDriver>>,
    conveyor: Option<Arc<dyn ConveyorSwitch>>,
}

impl CoordinatorBuilder {
    pub fn new(config: SortConfig) -> Self {
        Self {
            config,
            frame_buffer_size: 60,
            detector: None,
            orientation: None,
            arm: None,
            conveyor: None,
        }
    }

    // Adjusts the frame buffer size between intake and the pipeline loop.
    pub fn frame_buffer_size(mut self, frame_buffer_size: usize) -> Self {
        self.frame_buffer_size = frame_buffer_size.max(1);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn orientation(mut self, orientation: Arc<dyn OrientationEstimator>) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn arm(mut self, arm: Arc<dyn ArmDriver>) -> Self {
        self.arm = Some(arm);
        self
    }

    pub fn conveyor(mut self, conveyor: Arc<dyn ConveyorSwitch>) -> Self {
        self.conveyor = Some(conveyor);
        self
    }

    pub fn build(self) -> Result<Coordinator, SortError> {
        let detector = self
            .detector
            .ok_or_else(|| SortError::Coordinator("Detector not set".to_string()))?;
        let orientation = self
            .orientation
            .ok_or_else(|| SortError::Coordinator("Orientation estimator not set".to_string()))?;
        let arm = self
            .arm
            .ok_or_else(|| SortError::Coordinator("Arm driver not set".to_string()))?;
        let conveyor = self
            .conveyor
            .ok_or_else(|| SortError::Coordinator("Conveyor switch not set".to_string()))?;

        let cancel_token = CancellationToken::new();
        let picker = PickCoordinator::new(
            self.config.clone(),
            orientation,
            arm,
            conveyor,
            cancel_token.clone(),
        )?;
        Ok(Coordinator::new(
            self.config,
            picker,
            detector,
            self.frame_buffer_size,
            cancel_token,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BoundingBox, Detection};
    use crate::error::ConveyorError;
    use crate::hardware::SimulatedArm;
    use crate::vision::{MomentEstimator, StaticDetector};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingConveyor {
        stops: AtomicUsize,
        starts: AtomicUsize,
    }

    #[async_trait]
    impl ConveyorSwitch for CountingConveyor {
        async fn turn_on(&self) -> Result<(), ConveyorError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn turn_off(&self) -> Result<(), ConveyorError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn is_on(&self) -> Result<bool, ConveyorError> {
            Ok(true)
        }

        fn name(&self) -> &'static str {
            "CountingConveyor"
        }
    }

    fn test_config() -> SortConfig {
        let mut cfg = SortConfig::default();
        cfg.stable_frames = 3;
        cfg.cooldown_secs = 1.0;
        cfg.intake.width = 640;
        cfg.intake.height = 480;
        cfg
    }

    #[test]
    fn build_fails_without_collaborators() {
        let result = CoordinatorBuilder::new(test_config()).build();
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn coordinator_picks_a_stable_static_target() {
        // center of a 640x480 synthetic frame, inside the ROI
        let bottle = Detection::new(
            "plastic_bottle",
            0.9,
            BoundingBox::new(290.0, 210.0, 350.0, 270.0),
        );
        let conveyor = Arc::new(CountingConveyor::default());
        let coordinator = CoordinatorBuilder::new(test_config())
            .frame_buffer_size(8)
            .detector(Arc::new(StaticDetector::new(vec![bottle])))
            .orientation(Arc::new(MomentEstimator::new()))
            .arm(Arc::new(SimulatedArm::new()))
            .conveyor(conveyor.clone())
            .build()
            .expect("Failed to build coordinator");

        let mut status = coordinator.status_watch();
        loop {
            status.changed().await.expect("status channel closed");
            if status.borrow().picks_completed >= 1 {
                break;
            }
        }

        assert_eq!(conveyor.stops.load(Ordering::SeqCst), 1);
        assert_eq!(conveyor.starts.load(Ordering::SeqCst), 1);

        coordinator.stop();
        coordinator.join().await;
    }
}
