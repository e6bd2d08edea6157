mod drag;
mod error;
mod merge;
mod mutations;
mod picker;
mod queries;

pub use drag::DragSession;
pub use error::EngineError;
pub use merge::{is_normalized, merge_ranges, remove_hour, subtract_reserved};
pub use mutations::Toggle;
pub use picker::RangePicker;

use std::collections::BTreeMap;

use crate::model::*;

/// Per-day hour selections plus the reserved hours the caller last supplied.
///
/// Every day in `selections` holds a merged, non-empty range list. Reserved
/// ranges are read-only input and never flow into `selections`.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    selections: SelectionSet,
    reserved: BTreeMap<DayKey, Vec<ReservedRange>>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the day's ranges with the merged form of `ranges`, pruning the
    /// day when nothing is left. The single write path for `selections`.
    pub(super) fn store_day(&mut self, day: DayKey, ranges: &[HourRange]) {
        let merged = merge_ranges(ranges);
        debug_assert!(is_normalized(&merged), "merged ranges must be normalized");
        if merged.is_empty() {
            self.selections.remove(&day);
        } else {
            self.selections.insert(day, DaySelection::from_merged(merged));
        }
    }

    pub(super) fn day_ranges(&self, day: DayKey) -> &[HourRange] {
        self.selections
            .get(&day)
            .map(DaySelection::ranges)
            .unwrap_or(&[])
    }

    pub(super) fn day_reserved(&self, day: DayKey) -> &[ReservedRange] {
        self.reserved.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }
}
