use tracing::debug;

use crate::model::*;

use super::SelectionEngine;

/// Press-drag-release selection over one day.
///
/// Lives outside the engine: it remembers the anchor hour and the day's ranges
/// as they were when the press happened. Every hover recomputes the day from
/// that snapshot, so dragging back over hours already passed retracts them.
#[derive(Debug, Clone)]
pub struct DragSession {
    day: DayKey,
    anchor: Hour,
    snapshot: Vec<HourRange>,
    candidate: Option<HourRange>,
}

impl DragSession {
    /// Pointer down on `anchor`. Does not change the selection.
    pub fn begin(engine: &SelectionEngine, day: DayKey, anchor: Hour) -> Self {
        debug!(%day, %anchor, "drag started");
        Self {
            day,
            anchor,
            snapshot: engine.ranges(day).to_vec(),
            candidate: None,
        }
    }

    pub fn day(&self) -> DayKey {
        self.day
    }

    pub fn anchor(&self) -> Hour {
        self.anchor
    }

    /// Range the drag currently covers; `None` until the first hover.
    pub fn candidate(&self) -> Option<HourRange> {
        self.candidate
    }

    /// Pointer entered `hour` while pressed.
    pub fn hover(&mut self, engine: &mut SelectionEngine, hour: Hour) -> HourRange {
        let candidate = HourRange::spanning(self.anchor, hour);
        let mut ranges = self.snapshot.clone();
        ranges.push(candidate);
        engine.replace_day(self.day, &ranges);
        self.candidate = Some(candidate);
        candidate
    }

    /// Pointer up: keep whatever the last hover produced.
    pub fn finish(self) -> Option<HourRange> {
        debug!(day = %self.day, candidate = ?self.candidate, "drag finished");
        self.candidate
    }

    /// Abandon the drag and put the day back as it was before the press.
    pub fn cancel(self, engine: &mut SelectionEngine) {
        engine.replace_day(self.day, &self.snapshot);
        debug!(day = %self.day, "drag cancelled");
    }
}
