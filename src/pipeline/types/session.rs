use tokio::time::Instant;
use uuid::Uuid;

use crate::common::Detection;

use super::SortBin;

/// Live pick bookkeeping. Exists only while the coordinator is outside
/// IDLE; created on acquisition, dropped on IDLE re-entry. The state
/// machine guarantees at most one at a time.
#[derive(Debug, Clone)]
pub struct PickSession {
    session_id: Uuid,
    started_at: Instant,
    target: Detection,
    bin: SortBin,
}

impl PickSession {
    pub fn new(target: Detection, bin: SortBin) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Instant::now(),
            target,
            bin,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Snapshot of the detection that triggered the pick. The live frame
    /// stream keeps moving; the session never re-reads it.
    pub fn target(&self) -> &Detection {
        &self.target
    }

    pub fn bin(&self) -> SortBin {
        self.bin
    }
}
