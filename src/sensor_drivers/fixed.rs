use std::collections::HashMap;

use async_trait::async_trait;

use crate::{error::Result, sensors::SensorDriver, slots::SlotId};

/// Sensor backend that reports preconfigured readings.
///
/// Slots without a configured value read as unoccupied.
#[derive(Debug, Default)]
pub struct FixedDriver {
    values: HashMap<SlotId, bool>,
}

impl FixedDriver {
    pub fn new(values: impl IntoIterator<Item = (SlotId, bool)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

#[async_trait]
impl SensorDriver for FixedDriver {
    async fn read(&self, slot: &SlotId) -> Result<bool> {
        Ok(self.values.get(slot).copied().unwrap_or(false))
    }
}
