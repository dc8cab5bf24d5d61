use std::{collections::HashMap, path::PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, info};

use crate::{
    error::{ParkError, Result},
    sensors::SensorDriver,
    slots::SlotId,
};

/// Presence sensors wired to GPIO lines exported through `/sys/class/gpio`.
///
/// With `active_low` set (pull-up wiring) a low line means occupied.
#[derive(Debug)]
pub struct SysfsGpioDriver {
    base_path: PathBuf,
    active_low: bool,
    pins: HashMap<SlotId, u32>,
}

impl SysfsGpioDriver {
    pub fn new(
        base_path: PathBuf,
        active_low: bool,
        pins: impl IntoIterator<Item = (SlotId, u32)>,
    ) -> Self {
        Self {
            base_path,
            active_low,
            pins: pins.into_iter().collect(),
        }
    }

    fn line_dir(&self, pin: u32) -> PathBuf {
        self.base_path.join(format!("gpio{pin}"))
    }

    /// Exports every configured line that is not exported yet and sets it as an input.
    pub async fn export_all(&self) -> anyhow::Result<()> {
        for (slot, pin) in &self.pins {
            let line = self.line_dir(*pin);
            let exported = tokio::fs::try_exists(&line)
                .await
                .with_context(|| format!("Failed to inspect GPIO {pin}"))?;
            if !exported {
                info!("Exporting GPIO {pin} for {slot}");
                tokio::fs::write(self.base_path.join("export"), pin.to_string())
                    .await
                    .with_context(|| format!("Failed to export GPIO {pin}"))?;
            }
            tokio::fs::write(line.join("direction"), "in")
                .await
                .with_context(|| format!("Failed to set GPIO {pin} as input"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl SensorDriver for SysfsGpioDriver {
    async fn read(&self, slot: &SlotId) -> Result<bool> {
        let pin = self
            .pins
            .get(slot)
            .ok_or_else(|| ParkError::UnknownSlot(slot.clone()))?;

        let raw = tokio::fs::read_to_string(self.line_dir(*pin).join("value"))
            .await
            .map_err(|e| ParkError::SensorFault {
                slot: slot.clone(),
                reason: format!("GPIO {pin}: {e}"),
            })?;

        let high = match raw.trim() {
            "1" => true,
            "0" => false,
            other => {
                return Err(ParkError::SensorFault {
                    slot: slot.clone(),
                    reason: format!("GPIO {pin} value '{other}' out of range"),
                });
            }
        };
        debug!("GPIO {pin} ({slot}) level {}", u8::from(high));

        Ok(high != self.active_low)
    }
}
