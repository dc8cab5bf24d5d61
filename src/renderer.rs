//! Rendering side of the status display.

use log::info;

use crate::slots::{SlotId, status_label};

/// Receives per-slot occupancy changes. Fire-and-forget.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer: Send + Sync {
    fn paint(&self, slot: &SlotId, occupied: bool);
}

/// Status board that writes one line per repainted slot to the log.
#[derive(Debug, Default)]
pub struct StatusBoardRenderer;

impl StatusBoardRenderer {
    fn line(slot: &SlotId, occupied: bool) -> String {
        format!("{slot}: {}", status_label(occupied))
    }
}

impl Renderer for StatusBoardRenderer {
    fn paint(&self, slot: &SlotId, occupied: bool) {
        info!("{}", Self::line(slot, occupied));
    }
}
