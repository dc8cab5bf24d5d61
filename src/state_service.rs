//! Request handlers behind the HTTP boundary: sensor read-through and
//! external updates against the shared [`SlotStore`].

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use log::{debug, warn};
use serde_json::Value;

use crate::{
    error::{ParkError, Result},
    event::{Event, EventBus},
    sensors::SensorDriver,
    slot_store::SlotStore,
    slots::{OccupancyMap, SlotId},
};

/// Occupancy state service.
///
/// `fetch_state` always re-reads every sensor and overwrites the stored
/// value, so a value set through `apply_update` only lasts until the next
/// fetch. Sensor readings are the authority; updates are overrides.
pub struct StateService {
    store: Arc<SlotStore>,
    sensors: Arc<dyn SensorDriver>,
    sensor_timeout: Duration,
    event_bus: EventBus,
}

impl StateService {
    pub fn new(
        store: Arc<SlotStore>,
        sensors: Arc<dyn SensorDriver>,
        sensor_timeout: Duration,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            sensors,
            sensor_timeout,
            event_bus,
        }
    }

    pub fn store(&self) -> &Arc<SlotStore> {
        &self.store
    }

    /// Reads every sensor, stores the readings and returns the resulting snapshot.
    ///
    /// A sensor that fails, times out or reports garbage counts as unoccupied.
    pub async fn fetch_state(&self) -> Result<OccupancyMap> {
        let readings = join_all(self.store.slots().map(|slot| self.read_sensor(slot))).await;
        let snapshot = self.store.write_many(readings).await?;

        if self
            .event_bus
            .publish(Event::SlotsRefreshed(snapshot.clone()))
            .is_err()
        {
            debug!("No subscribers for refreshed state");
        }

        Ok(snapshot)
    }

    async fn read_sensor(&self, slot: &SlotId) -> (SlotId, bool) {
        let occupied = match tokio::time::timeout(self.sensor_timeout, self.sensors.read(slot)).await
        {
            Ok(Ok(occupied)) => occupied,
            Ok(Err(e)) => {
                warn!("{e}, reporting '{slot}' as unoccupied");
                false
            }
            Err(_) => {
                let fault = ParkError::SensorFault {
                    slot: slot.clone(),
                    reason: ParkError::Timeout(self.sensor_timeout).to_string(),
                };
                warn!("{fault}, reporting '{slot}' as unoccupied");
                false
            }
        };
        (slot.clone(), occupied)
    }

    /// Merges the recognised slots of `payload` into the store.
    ///
    /// Keys outside the configured slot set are ignored. Returns the slots
    /// that were actually written. Nothing is written when the payload is
    /// rejected.
    pub async fn apply_update(&self, payload: &Value) -> Result<OccupancyMap> {
        let object = payload
            .as_object()
            .ok_or_else(|| ParkError::MalformedInput("Expected a JSON object".to_string()))?;
        if object.is_empty() {
            return Err(ParkError::MalformedInput(
                "No JSON data received".to_string(),
            ));
        }

        let mut applied = OccupancyMap::new();
        for (key, value) in object {
            if !self.store.contains(key) {
                debug!("Ignoring update for unknown slot '{key}'");
                continue;
            }
            let occupied = value.as_bool().ok_or_else(|| {
                ParkError::MalformedInput(format!("Value for '{key}' must be a boolean"))
            })?;
            applied.insert(SlotId::from(key.as_str()), occupied);
        }

        if !applied.is_empty() {
            self.store.write_many(applied.clone()).await?;
        }

        if self
            .event_bus
            .publish(Event::SlotsUpdated(applied.clone()))
            .is_err()
        {
            debug!("No subscribers for applied update");
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::MockSensorDriver;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn slot(id: &str) -> SlotId {
        SlotId::from(id)
    }

    fn occupancy(entries: &[(&str, bool)]) -> OccupancyMap {
        entries.iter().map(|(id, v)| (slot(id), *v)).collect()
    }

    fn service_with(sensors: impl SensorDriver + 'static, ids: &[&str]) -> StateService {
        StateService::new(
            Arc::new(SlotStore::new(ids.iter().map(|id| slot(id)))),
            Arc::new(sensors),
            Duration::from_millis(100),
            EventBus::new(),
        )
    }

    fn all_vacant_sensor() -> MockSensorDriver {
        let mut sensors = MockSensorDriver::new();
        sensors.expect_read().returning(|_| Ok(false));
        sensors
    }

    struct StalledSensor;

    #[async_trait]
    impl SensorDriver for StalledSensor {
        async fn read(&self, slot: &SlotId) -> Result<bool> {
            if slot.as_str() == "Slot1" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(true)
        }
    }

    #[tokio::test]
    async fn fetch_reads_every_slot_once() {
        let mut sensors = MockSensorDriver::new();
        sensors
            .expect_read()
            .with(eq(slot("Slot1")))
            .times(1)
            .returning(|_| Ok(true));
        sensors
            .expect_read()
            .with(eq(slot("Slot2")))
            .times(1)
            .returning(|_| Ok(false));

        let service = service_with(sensors, &["Slot1", "Slot2"]);
        let snapshot = service.fetch_state().await.unwrap();

        assert_eq!(snapshot, occupancy(&[("Slot1", true), ("Slot2", false)]));
    }

    #[tokio::test]
    async fn fetch_overwrites_external_update() {
        let service = service_with(all_vacant_sensor(), &["Slot1", "Slot2"]);

        service.apply_update(&json!({"Slot1": true})).await.unwrap();
        assert!(service.store().read(&slot("Slot1")).await.unwrap());

        let snapshot = service.fetch_state().await.unwrap();
        assert_eq!(snapshot.get("Slot1"), Some(&false));
        assert!(!service.store().read(&slot("Slot1")).await.unwrap());
    }

    #[tokio::test]
    async fn sensor_fault_reads_as_unoccupied() {
        let mut sensors = MockSensorDriver::new();
        sensors.expect_read().returning(|s| {
            if s.as_str() == "Slot2" {
                Err(ParkError::SensorFault {
                    slot: s.clone(),
                    reason: "line unreadable".to_string(),
                })
            } else {
                Ok(true)
            }
        });

        let service = service_with(sensors, &["Slot1", "Slot2"]);
        service.store().write(&slot("Slot2"), true).await.unwrap();

        let snapshot = service.fetch_state().await.unwrap();
        assert_eq!(snapshot, occupancy(&[("Slot1", true), ("Slot2", false)]));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_sensor_times_out_as_unoccupied() {
        let service = service_with(StalledSensor, &["Slot1", "Slot2"]);

        let snapshot = service.fetch_state().await.unwrap();
        assert_eq!(snapshot, occupancy(&[("Slot1", false), ("Slot2", true)]));
    }

    #[tokio::test]
    async fn update_ignores_unknown_slots() {
        let service = service_with(all_vacant_sensor(), &["Slot1", "Slot2"]);

        let applied = service
            .apply_update(&json!({"Slot1": true, "Slot9": true}))
            .await
            .unwrap();

        assert_eq!(applied, occupancy(&[("Slot1", true)]));
        assert_eq!(
            service.store().snapshot().await,
            occupancy(&[("Slot1", true), ("Slot2", false)])
        );
    }

    #[tokio::test]
    async fn update_with_only_unknown_slots_succeeds_empty() {
        let service = service_with(all_vacant_sensor(), &["Slot1"]);

        let applied = service.apply_update(&json!({"Slot9": true})).await.unwrap();
        assert!(applied.is_empty());
    }

    #[tokio::test]
    async fn update_does_not_read_sensors() {
        let mut sensors = MockSensorDriver::new();
        sensors.expect_read().never();
        let service = service_with(sensors, &["Slot1"]);

        service.apply_update(&json!({"Slot1": true})).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_updates_never_mutate() {
        let service = service_with(all_vacant_sensor(), &["Slot1", "Slot2"]);
        let before = service.store().snapshot().await;

        for payload in [
            json!({}),
            json!([{"Slot1": true}]),
            json!(null),
            json!("Slot1"),
            json!({"Slot1": true, "Slot2": "yes"}),
        ] {
            let result = service.apply_update(&payload).await;
            assert!(
                matches!(result, Err(ParkError::MalformedInput(_))),
                "payload {payload} should be rejected"
            );
        }

        assert_eq!(service.store().snapshot().await, before);
    }

    #[tokio::test]
    async fn empty_object_message() {
        let service = service_with(all_vacant_sensor(), &["Slot1"]);
        let err = service.apply_update(&json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "No JSON data received");
    }

    #[tokio::test]
    async fn operations_publish_events() {
        let service = service_with(all_vacant_sensor(), &["Slot1"]);
        let mut receiver = service.event_bus.subscribe();

        service.apply_update(&json!({"Slot1": true})).await.unwrap();
        service.fetch_state().await.unwrap();

        match receiver.recv().await.unwrap() {
            Event::SlotsUpdated(applied) => assert_eq!(applied, occupancy(&[("Slot1", true)])),
            other => panic!("Expected SlotsUpdated, got {other:?}"),
        }
        match receiver.recv().await.unwrap() {
            Event::SlotsRefreshed(snapshot) => {
                assert_eq!(snapshot, occupancy(&[("Slot1", false)]))
            }
            other => panic!("Expected SlotsRefreshed, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_and_fetches_stay_complete() {
        let service = Arc::new(service_with(
            all_vacant_sensor(),
            &["Slot1", "Slot2", "Slot3", "Slot4"],
        ));

        let updaters: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        service
                            .apply_update(&json!({
                                "Slot1": true, "Slot2": true, "Slot3": true, "Slot4": true
                            }))
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();

        let fetcher = {
            let service = service.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    let snapshot = service.fetch_state().await.unwrap();
                    assert_eq!(snapshot.len(), 4);
                    assert!(snapshot.values().all(|v| !v), "mixed fetch: {snapshot:?}");

                    let observed = service.store().snapshot().await;
                    assert_eq!(observed.len(), 4);
                    let first = observed["Slot1"];
                    assert!(observed.values().all(|v| *v == first), "mixed read: {observed:?}");
                }
            })
        };

        for updater in updaters {
            updater.await.unwrap();
        }
        fetcher.await.unwrap();
    }
}
