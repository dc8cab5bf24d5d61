//! Poll-diff-paint loop keeping a status display in step with the state service.

use std::{collections::BTreeMap, time::Duration};

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{ParkError, Result},
    renderer::Renderer,
    slots::{OccupancyMap, SlotId},
    state_source::StateSource,
};

/// Polling display client.
///
/// Keeps a shadow copy of the last painted value per slot and forwards only
/// the slots whose value changed. Every slot starts unknown, so the first
/// successful fetch paints all of them. A failed fetch leaves the shadow
/// untouched.
pub struct DisplaySync {
    source: Box<dyn StateSource>,
    renderer: Box<dyn Renderer>,
    shadow: BTreeMap<SlotId, Option<bool>>,
    poll_interval: Duration,
}

impl DisplaySync {
    pub fn new(
        slots: impl IntoIterator<Item = SlotId>,
        source: Box<dyn StateSource>,
        renderer: Box<dyn Renderer>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            renderer,
            shadow: slots.into_iter().map(|slot| (slot, None)).collect(),
            poll_interval,
        }
    }

    pub fn shadow(&self) -> &BTreeMap<SlotId, Option<bool>> {
        &self.shadow
    }

    /// Runs one fetch-and-diff iteration, returning how many slots were repainted.
    pub async fn tick(&mut self) -> Result<usize> {
        let state = self.source.fetch().await?;
        let fresh = self.validate(&state)?;

        let mut painted = 0;
        for (slot, occupied) in fresh {
            let Some(known) = self.shadow.get_mut(&slot) else {
                continue;
            };
            if *known != Some(occupied) {
                self.renderer.paint(&slot, occupied);
                *known = Some(occupied);
                painted += 1;
            }
        }

        Ok(painted)
    }

    /// Every configured slot must carry a boolean; extra keys are ignored.
    fn validate(&self, state: &OccupancyMap) -> Result<Vec<(SlotId, bool)>> {
        self.shadow
            .keys()
            .map(|slot| {
                state
                    .get(slot)
                    .map(|occupied| (slot.clone(), *occupied))
                    .ok_or_else(|| {
                        ParkError::MalformedResponse(format!("no boolean for slot '{slot}'"))
                    })
            })
            .collect()
    }

    /// Polls until `cancel_token` fires.
    ///
    /// An in-flight fetch is allowed to finish or time out; cancellation is
    /// observed between iterations and during the delay.
    pub async fn run(mut self, cancel_token: CancellationToken) -> anyhow::Result<()> {
        info!(
            "Display sync polling every {:?} for {} slots",
            self.poll_interval,
            self.shadow.len()
        );

        while !cancel_token.is_cancelled() {
            match self.tick().await {
                Ok(0) => debug!("Display up to date"),
                Ok(painted) => debug!("Repainted {painted} slots"),
                Err(e) => warn!("Display refresh failed: {e}"),
            }

            tokio::select! {
                () = cancel_token.cancelled() => break,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("Display sync cancelled");
        Ok(())
    }
}
