//! The single in-memory source of truth for slot occupancy.

use std::collections::BTreeSet;

use tokio::sync::RwLock;

use crate::{
    error::{ParkError, Result},
    slots::{OccupancyMap, SlotId},
};

/// Concurrently shared occupancy store for a fixed slot set.
///
/// Every configured slot has an entry from construction onwards, so
/// [`snapshot`](Self::snapshot) always covers exactly the configured set.
/// One lock guards the whole map: a multi-slot write is a single critical
/// section and readers never observe it half applied.
///
/// # Example
///
/// ```no_run
/// use parkd::{slot_store::SlotStore, slots::SlotId};
///
/// # async fn example() -> parkd::error::Result<()> {
/// let store = SlotStore::new([SlotId::from("Slot1"), SlotId::from("Slot2")]);
/// store.write(&SlotId::from("Slot1"), true).await?;
/// assert!(store.read(&SlotId::from("Slot1")).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SlotStore {
    slots: BTreeSet<SlotId>,
    state: RwLock<OccupancyMap>,
}

impl SlotStore {
    /// Creates a store with every slot unoccupied.
    pub fn new(slots: impl IntoIterator<Item = SlotId>) -> Self {
        let slots: BTreeSet<SlotId> = slots.into_iter().collect();
        let state = slots.iter().map(|slot| (slot.clone(), false)).collect();

        Self {
            slots,
            state: RwLock::new(state),
        }
    }

    /// Configured slots in their natural order.
    pub fn slots(&self) -> impl Iterator<Item = &SlotId> {
        self.slots.iter()
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains(slot)
    }

    pub async fn read(&self, slot: &SlotId) -> Result<bool> {
        self.state
            .read()
            .await
            .get(slot)
            .copied()
            .ok_or_else(|| ParkError::UnknownSlot(slot.clone()))
    }

    pub async fn write(&self, slot: &SlotId, value: bool) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state
            .get_mut(slot)
            .ok_or_else(|| ParkError::UnknownSlot(slot.clone()))?;
        *entry = value;
        Ok(())
    }

    /// Applies several slot values as one atomic write.
    ///
    /// Returns the snapshot taken under the same lock. If any slot is
    /// unknown nothing is written.
    pub async fn write_many<I>(&self, entries: I) -> Result<OccupancyMap>
    where
        I: IntoIterator<Item = (SlotId, bool)>,
    {
        let entries: Vec<(SlotId, bool)> = entries.into_iter().collect();
        if let Some((unknown, _)) = entries.iter().find(|(slot, _)| !self.slots.contains(slot)) {
            return Err(ParkError::UnknownSlot(unknown.clone()));
        }

        let mut state = self.state.write().await;
        state.extend(entries);
        Ok(state.clone())
    }

    /// Returns a consistent copy of the whole map.
    pub async fn snapshot(&self) -> OccupancyMap {
        self.state.read().await.clone()
    }
}
