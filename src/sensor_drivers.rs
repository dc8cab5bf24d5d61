//! Concrete presence sensor backends.

pub mod fixed;
pub mod sysfs_gpio;

use std::sync::Arc;

use log::warn;

use crate::{
    config::{Config, SensorCfg},
    sensors::SensorDriver,
    slots::SlotId,
};

pub use fixed::FixedDriver;
pub use sysfs_gpio::SysfsGpioDriver;

/// Builds the sensor backend selected by the configuration.
///
/// GPIO lines are exported here; an export failure is logged and the
/// affected slots report sensor faults on read.
pub async fn from_config(config: &Config) -> Arc<dyn SensorDriver> {
    match &config.sensor {
        SensorCfg::SysfsGpio {
            base_path,
            active_low,
        } => {
            let pins = config
                .slots
                .iter()
                .filter_map(|s| s.pin.map(|pin| (SlotId::from(s.id.as_str()), pin)));
            let driver = SysfsGpioDriver::new(base_path.clone(), *active_low, pins);
            if let Err(e) = driver.export_all().await {
                warn!("GPIO export incomplete: {e:#}");
            }
            Arc::new(driver)
        }
        SensorCfg::Fixed { values } => Arc::new(FixedDriver::new(
            values
                .iter()
                .map(|(id, value)| (SlotId::from(id.as_str()), *value)),
        )),
    }
}
