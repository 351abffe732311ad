use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{sleep, timeout, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::{Detection, Frame};
use crate::config::SortConfig;
use crate::error::{ConfigError, SortError};
use crate::hardware::{ArmDriver, ConveyorSwitch};
use crate::pipeline::geometry;
use crate::pipeline::selector::{Selection, TargetSelector};
use crate::pipeline::sequence::SequenceBuilder;
use crate::pipeline::stability::{StabilityTracker, TriggerDecision};
use crate::pipeline::types::{
    AngleResult, PickSession, PickState, PickStatus, RotationMode,
};
use crate::vision::OrientationEstimator;

/// The single authority over the conveyor and the arm. Consumes one frame
/// at a time, drives selector and tracker while IDLE, and turns an
/// acquisition into a conveyor-stop / motion-sequence / conveyor-resume /
/// cooldown cycle. No other component issues hardware commands, so there
/// is nothing to lock.
pub struct PickCoordinator {
    config: SortConfig,
    selector: TargetSelector,
    tracker: StabilityTracker,
    builder: SequenceBuilder,
    orientation: Arc<dyn OrientationEstimator>,
    arm: Arc<dyn ArmDriver>,
    conveyor: Arc<dyn ConveyorSwitch>,
    cancel: CancellationToken,
    state: PickState,
    cooldown_started: Option<Instant>,
    session: Option<PickSession>,
    status: PickStatus,
    status_tx: watch::Sender<PickStatus>,
}

impl PickCoordinator {
    /// Fails on any malformed configuration; a coordinator that could die
    /// mid-pick must never reach IDLE in the first place.
    pub fn new(
        config: SortConfig,
        orientation: Arc<dyn OrientationEstimator>,
        arm: Arc<dyn ArmDriver>,
        conveyor: Arc<dyn ConveyorSwitch>,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let selector = TargetSelector::new(
            config.roi,
            config.confidence_threshold,
            config.categories.clone(),
        );
        let tracker = StabilityTracker::new(config.stable_frames, config.allow_out_of_roi_trigger);
        let builder = SequenceBuilder::new(config.rotation, config.fine_tune);
        let status = PickStatus::default();
        let (status_tx, _) = watch::channel(status.clone());
        info!(
            orientation = orientation.name(),
            arm = arm.name(),
            conveyor = conveyor.name(),
            stable_frames = config.stable_frames,
            "Pick coordinator ready"
        );
        Ok(Self {
            config,
            selector,
            tracker,
            builder,
            orientation,
            arm,
            conveyor,
            cancel,
            state: PickState::Idle,
            cooldown_started: None,
            session: None,
            status,
            status_tx,
        })
    }

    pub fn state(&self) -> PickState {
        self.state
    }

    pub fn status(&self) -> &PickStatus {
        &self.status
    }

    /// The in-flight pick, while one exists. `None` exactly when IDLE.
    pub fn session(&self) -> Option<&PickSession> {
        self.session.as_ref()
    }

    /// Status surface: every transition is published here, with the reason
    /// for the most recent abort.
    pub fn status_watch(&self) -> watch::Receiver<PickStatus> {
        self.status_tx.subscribe()
    }

    /// Feed one frame and its detections. Outside IDLE the frame is still
    /// consumed (the camera keeps running) but selector and tracker are
    /// not driven, so nothing can re-trigger mid-pick.
    pub async fn process_frame(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<(), SortError> {
        match self.state {
            PickState::Cooldown => {
                let elapsed = self
                    .cooldown_started
                    .map(|started| started.elapsed())
                    .unwrap_or_default();
                if elapsed >= self.config.cooldown() {
                    self.enter_idle();
                } else {
                    debug!(frame = frame.index(), "Cooldown: frame discarded");
                }
                Ok(())
            }
            PickState::Picking => {
                // A pick is being executed on this very task; a frame can
                // only land here if an external caller races the loop.
                debug!(frame = frame.index(), "Picking: frame discarded");
                Ok(())
            }
            PickState::Idle => {
                let selection = self.selector.select(frame, detections);
                let decision = self.tracker.observe(selection.as_ref());
                if decision == TriggerDecision::Acquire {
                    if let Some(selection) = selection {
                        self.execute_pick(frame, selection).await;
                    }
                }
                Ok(())
            }
        }
    }

    async fn execute_pick(&mut self, frame: &Frame, selection: Selection) {
        let detection = selection.detection;
        let Some(profile) = self.config.categories.profile(&detection.label).cloned() else {
            // selector whitelists against the same map, so this is dead in
            // practice; reset and carry on rather than pick blind
            warn!(label = detection.label.as_str(), "No profile for acquired target");
            self.tracker.force_reset();
            return;
        };

        info!(
            label = detection.label.as_str(),
            confidence = detection.confidence,
            bin = profile.bin.name(),
            "Target acquired, starting pick"
        );
        self.session = Some(PickSession::new(detection.clone(), profile.bin));
        self.set_state(PickState::Picking, None);
        // the run that fired must not linger into the next object
        self.tracker.force_reset();

        // Belt stops (or times out) strictly before the first step.
        self.conveyor_command(false).await;
        sleep(self.config.conveyor.settle()).await;

        let angle = if profile.rotation == RotationMode::AngleAware {
            let angle = self.orientation.estimate(frame, &detection.bbox);
            if angle.valid {
                debug!(degrees = angle.degrees, "Orientation estimated");
            } else {
                info!("Orientation undetermined, gripping at neutral");
            }
            angle
        } else {
            AngleResult::invalid()
        };

        let (cx, cy) = frame.center();
        let (ox, oy) = detection.center();
        let offset = geometry::pixel_offset_to_fine_tune(
            (ox - cx) as f64,
            (oy - cy) as f64,
            &self.config.fine_tune,
        );

        let template = self.config.templates.for_bin(profile.bin);
        let sequence = self.builder.build(template, &profile, &angle, &offset);
        info!(
            bin = profile.bin.name(),
            steps = sequence.len(),
            "Executing motion sequence"
        );

        let mut abort: Option<String> = None;
        for (index, step) in sequence.steps.iter().enumerate() {
            // Operator abort lands on step boundaries only; a step already
            // issued is allowed to finish.
            if self.cancel.is_cancelled() {
                abort = Some(format!("operator abort before step {index}"));
                break;
            }
            if let Err(e) = self.arm.move_to(step.positions, step.duration_ms).await {
                abort = Some(format!("arm failed at step {index}: {e}"));
                break;
            }
            // the arm is physically moving for this long; the next step
            // must not be issued early
            sleep(Duration::from_millis(step.duration_ms)).await;
        }

        if let Err(e) = self.arm.disengage().await {
            warn!("Arm disengage failed: {e}");
        }

        // Resume on success and on every failure path, so the belt is
        // never left stopped by a dead pick.
        self.conveyor_command(true).await;
        self.cooldown_started = Some(Instant::now());
        match abort {
            None => {
                self.status.picks_completed += 1;
                info!(bin = profile.bin.name(), "Pick complete");
                self.set_state(PickState::Cooldown, None);
            }
            Some(reason) => {
                self.status.picks_aborted += 1;
                error!(reason = reason.as_str(), "Pick aborted");
                self.set_state(PickState::Cooldown, Some(reason));
            }
        }
    }

    fn enter_idle(&mut self) {
        self.session = None;
        self.cooldown_started = None;
        self.tracker.force_reset();
        self.set_state(PickState::Idle, None);
    }

    fn set_state(&mut self, next: PickState, abort: Option<String>) {
        let prev = self.state;
        self.state = next;
        if abort.is_some() {
            self.status.last_abort = abort;
        }
        self.status.state = next;
        self.status_tx.send_replace(self.status.clone());
        info!(from = prev.name(), to = next.name(), "State transition");
    }

    async fn conveyor_command(&self, on: bool) {
        let command = if on {
            self.conveyor.turn_on()
        } else {
            self.conveyor.turn_off()
        };
        match timeout(self.config.conveyor.timeout(), command).await {
            Ok(Ok(())) => debug!(on, "Conveyor command acknowledged"),
            Ok(Err(e)) => warn!(on, "Conveyor command failed: {e}"),
            Err(_) => warn!(
                on,
                timeout_ms = self.config.conveyor.timeout_ms,
                "Conveyor command timed out; belt state indeterminate"
            ),
        }
    }
}
