mod kasa;

pub use kasa::KasaPlug;

use async_trait::async_trait;

use crate::error::ConveyorError;

/// The conveyor power switch, seen from the coordinator. All calls are
/// network round-trips with bounded completion; `is_on` is a best-effort
/// probe, never treated as authoritative.
#[async_trait]
pub trait ConveyorSwitch: Send + Sync {
    async fn turn_on(&self) -> Result<(), ConveyorError>;

    async fn turn_off(&self) -> Result<(), ConveyorError>;

    async fn is_on(&self) -> Result<bool, ConveyorError>;

    fn name(&self) -> &'static str;
}
