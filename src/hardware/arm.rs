use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::ArmError;
use crate::pipeline::types::SERVO_COUNT;

/// The arm's motor execution layer, seen from the coordinator: issue one
/// pose, learn whether it was accepted. The coordinator owns all step
/// pacing; drivers must not sequence moves on their own.
#[async_trait]
pub trait ArmDriver: Send + Sync {
    async fn move_to(
        &self,
        positions: [u16; SERVO_COUNT],
        duration_ms: u64,
    ) -> Result<(), ArmError>;

    /// Release servo torque, e.g. after a completed sequence.
    async fn disengage(&self) -> Result<(), ArmError>;

    fn name(&self) -> &'static str;
}

/// No-hardware stand-in: accepts every pose and remembers the last one.
/// Used when the rig runs without an arm attached, and in tests.
#[derive(Debug, Default)]
pub struct SimulatedArm {
    last_pose: Mutex<Option<[u16; SERVO_COUNT]>>,
}

impl SimulatedArm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_pose(&self) -> Option<[u16; SERVO_COUNT]> {
        *self.last_pose.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ArmDriver for SimulatedArm {
    async fn move_to(
        &self,
        positions: [u16; SERVO_COUNT],
        duration_ms: u64,
    ) -> Result<(), ArmError> {
        info!(?positions, duration_ms, "Simulated arm move");
        *self.last_pose.lock().unwrap_or_else(|e| e.into_inner()) = Some(positions);
        Ok(())
    }

    async fn disengage(&self) -> Result<(), ArmError> {
        debug!("Simulated arm disengaged");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SimulatedArm"
    }
}
