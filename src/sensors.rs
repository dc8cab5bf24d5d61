use async_trait::async_trait;

use crate::{error::Result, slots::SlotId};

/// Presence sensor capability: one boolean "occupied" reading per slot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorDriver: Send + Sync {
    async fn read(&self, slot: &SlotId) -> Result<bool>;
}
