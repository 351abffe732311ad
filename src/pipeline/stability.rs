use tracing::debug;

use crate::pipeline::selector::Selection;

/// What one frame's observation means for the trigger logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    None,
    /// The tracked target has been stable for the configured number of
    /// consecutive frames. Emitted exactly once per stable run.
    Acquire,
}

#[derive(Debug, Clone, Default)]
struct StabilityState {
    tracked_label: Option<String>,
    consecutive: u32,
    last_center: Option<(f32, f32)>,
    fired: bool,
}

/// Counts consecutive frames on which the same labeled target stayed the
/// selected candidate. Owns its state exclusively; the coordinator only
/// observes decisions and force-resets.
pub struct StabilityTracker {
    threshold: u32,
    /// Trigger policy for targets outside the ROI. When false (the
    /// conservative default) such candidates restart the run at 1 every
    /// frame and can never cross the threshold.
    allow_out_of_roi: bool,
    state: StabilityState,
}

impl StabilityTracker {
    pub fn new(threshold: u32, allow_out_of_roi: bool) -> Self {
        Self {
            threshold: threshold.max(1),
            allow_out_of_roi,
            state: StabilityState::default(),
        }
    }

    /// Feed one frame's selection. A missing candidate clears the run; a
    /// label change or a trigger-ineligible candidate restarts it at 1;
    /// otherwise the run advances. `Acquire` fires once, on the frame the
    /// run first reaches the threshold, and never again until a reset.
    pub fn observe(&mut self, selection: Option<&Selection>) -> TriggerDecision {
        let Some(selection) = selection else {
            if self.state.consecutive != 0 {
                debug!("Stability run cleared: no candidate");
            }
            self.state = StabilityState::default();
            return TriggerDecision::None;
        };

        let label = &selection.detection.label;
        let same_label = self.state.tracked_label.as_deref() == Some(label.as_str());
        let eligible = selection.in_roi || self.allow_out_of_roi;

        if !same_label || !eligible {
            self.state.tracked_label = Some(label.clone());
            self.state.consecutive = 1;
            self.state.fired = false;
        } else {
            self.state.consecutive += 1;
        }
        self.state.last_center = Some(selection.detection.center());
        debug!(
            label = label.as_str(),
            in_roi = selection.in_roi,
            consecutive = self.state.consecutive,
            threshold = self.threshold,
            "Stability run advanced"
        );

        if eligible && self.state.consecutive >= self.threshold && !self.state.fired {
            self.state.fired = true;
            TriggerDecision::Acquire
        } else {
            TriggerDecision::None
        }
    }

    /// Unconditional reset. Invoked when a pick is triggered and on every
    /// return to IDLE so the next object starts a clean run.
    pub fn force_reset(&mut self) {
        self.state = StabilityState::default();
    }

    pub fn consecutive(&self) -> u32 {
        self.state.consecutive
    }

    pub fn tracked_label(&self) -> Option<&str> {
        self.state.tracked_label.as_deref()
    }

    pub fn last_center(&self) -> Option<(f32, f32)> {
        self.state.last_center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BoundingBox, Detection};

    fn sel(label: &str, in_roi: bool) -> Selection {
        Selection {
            detection: Detection::new(label, 0.8, BoundingBox::new(0.0, 0.0, 50.0, 50.0)),
            in_roi,
        }
    }

    fn tracker(threshold: u32) -> StabilityTracker {
        StabilityTracker::new(threshold, false)
    }

    #[test]
    fn counter_resets_to_zero_when_candidate_disappears() {
        let mut t = tracker(3);
        t.observe(Some(&sel("plastic_bottle", true)));
        t.observe(Some(&sel("plastic_bottle", true)));
        assert_eq!(t.consecutive(), 2);
        t.observe(None);
        assert_eq!(t.consecutive(), 0);
        assert_eq!(t.tracked_label(), None);
    }

    #[test]
    fn label_change_restarts_run_at_one() {
        let mut t = tracker(3);
        t.observe(Some(&sel("plastic_bottle", true)));
        t.observe(Some(&sel("plastic_bottle", true)));
        t.observe(Some(&sel("paper_cup", true)));
        assert_eq!(t.consecutive(), 1);
        assert_eq!(t.tracked_label(), Some("paper_cup"));
    }

    #[test]
    fn acquire_fires_exactly_on_threshold_frame() {
        let mut t = tracker(3);
        assert_eq!(t.observe(Some(&sel("plastic_bottle", true))), TriggerDecision::None);
        assert_eq!(t.observe(Some(&sel("plastic_bottle", true))), TriggerDecision::None);
        assert_eq!(
            t.observe(Some(&sel("plastic_bottle", true))),
            TriggerDecision::Acquire
        );
    }

    #[test]
    fn acquire_does_not_refire_without_reset() {
        let mut t = tracker(2);
        t.observe(Some(&sel("plastic_bottle", true)));
        assert_eq!(
            t.observe(Some(&sel("plastic_bottle", true))),
            TriggerDecision::Acquire
        );
        for _ in 0..10 {
            assert_eq!(
                t.observe(Some(&sel("plastic_bottle", true))),
                TriggerDecision::None
            );
        }
    }

    #[test]
    fn out_of_roi_candidate_never_advances_past_one() {
        let mut t = tracker(3);
        for _ in 0..10 {
            assert_eq!(t.observe(Some(&sel("paper_cup", false))), TriggerDecision::None);
            assert_eq!(t.consecutive(), 1);
        }
    }

    #[test]
    fn permissive_policy_lets_out_of_roi_run_acquire() {
        let mut t = StabilityTracker::new(3, true);
        t.observe(Some(&sel("paper_cup", false)));
        t.observe(Some(&sel("paper_cup", false)));
        assert_eq!(
            t.observe(Some(&sel("paper_cup", false))),
            TriggerDecision::Acquire
        );
    }

    #[test]
    fn threshold_of_one_acquires_even_after_out_of_roi_warmup() {
        let mut t = tracker(1);
        assert_eq!(t.observe(Some(&sel("paper_cup", false))), TriggerDecision::None);
        assert_eq!(
            t.observe(Some(&sel("paper_cup", true))),
            TriggerDecision::Acquire
        );
    }

    #[test]
    fn force_reset_allows_a_fresh_acquire() {
        let mut t = tracker(2);
        t.observe(Some(&sel("plastic_bottle", true)));
        assert_eq!(
            t.observe(Some(&sel("plastic_bottle", true))),
            TriggerDecision::Acquire
        );
        t.force_reset();
        t.observe(Some(&sel("plastic_bottle", true)));
        assert_eq!(
            t.observe(Some(&sel("plastic_bottle", true))),
            TriggerDecision::Acquire
        );
    }
}
