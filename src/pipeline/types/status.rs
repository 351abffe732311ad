use serde::{Deserialize, Serialize};

/// Coordinator phase. Only the coordinator transitions between these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickState {
    /// Watching the belt, selector and tracker running every frame.
    Idle,
    /// A pick is in flight; new detections are ignored.
    Picking,
    /// Post-pick hold before triggers are accepted again.
    Cooldown,
}

impl PickState {
    pub fn name(&self) -> &'static str {
        match self {
            PickState::Idle => "IDLE",
            PickState::Picking => "PICKING",
            PickState::Cooldown => "COOLDOWN",
        }
    }
}

/// What the coordinator reports on every transition: the state it entered
/// and the reason for the most recent abort, if any. No transition is
/// silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickStatus {
    pub state: PickState,
    pub last_abort: Option<String>,
    pub picks_completed: u64,
    pub picks_aborted: u64,
}

impl Default for PickStatus {
    fn default() -> Self {
        Self {
            state: PickState::Idle,
            last_abort: None,
            picks_completed: 0,
            picks_aborted: 0,
        }
    }
}
