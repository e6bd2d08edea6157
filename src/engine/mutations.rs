use tracing::debug;

use crate::model::*;

use super::merge::remove_hour;
use super::SelectionEngine;

/// What `toggle_hour` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

impl SelectionEngine {
    /// Deselect `hour` if selected (shrinking or splitting its range), otherwise
    /// select it and merge with its neighbours. Other days are untouched.
    pub fn toggle_hour(&mut self, day: DayKey, hour: Hour) -> Toggle {
        if self.is_selected(day, hour) {
            self.remove_hour(day, hour);
            Toggle::Removed
        } else {
            let mut ranges = self.day_ranges(day).to_vec();
            ranges.push(HourRange::single(hour));
            self.store_day(day, &ranges);
            metrics::counter!(crate::observability::SELECTION_MUTATIONS_TOTAL, "op" => "add_hour")
                .increment(1);
            debug!(%day, %hour, "hour selected");
            Toggle::Added
        }
    }

    /// Deselect one hour. No-op when it is not selected.
    pub fn remove_hour(&mut self, day: DayKey, hour: Hour) {
        if !self.is_selected(day, hour) {
            return;
        }
        let ranges = remove_hour(self.day_ranges(day), hour);
        self.store_day(day, &ranges);
        metrics::counter!(crate::observability::SELECTION_MUTATIONS_TOTAL, "op" => "remove_hour")
            .increment(1);
        debug!(%day, %hour, "hour deselected");
    }

    /// Union `[min(a,b), max(a,b)]` into the day and merge.
    pub fn add_range(&mut self, day: DayKey, a: Hour, b: Hour) -> HourRange {
        let range = HourRange::spanning(a, b);
        let mut ranges = self.day_ranges(day).to_vec();
        ranges.push(range);
        self.store_day(day, &ranges);
        metrics::counter!(crate::observability::SELECTION_MUTATIONS_TOTAL, "op" => "add_range")
            .increment(1);
        debug!(%day, %range, "range selected");
        range
    }

    /// Drop the whole day. Idempotent.
    pub fn clear_day(&mut self, day: DayKey) {
        if self.selections.remove(&day).is_some() {
            metrics::counter!(crate::observability::SELECTION_MUTATIONS_TOTAL, "op" => "clear_day")
                .increment(1);
            debug!(%day, "day cleared");
        }
    }

    /// Overwrite the day's ranges wholesale (merged on the way in).
    pub fn replace_day(&mut self, day: DayKey, ranges: &[HourRange]) {
        self.store_day(day, ranges);
    }

    /// Replace the reserved hours known for `day`. An empty list is valid: the
    /// lookup failed or nothing is booked.
    pub fn set_reserved(&mut self, day: DayKey, reserved: Vec<ReservedRange>) {
        if reserved.is_empty() {
            self.reserved.remove(&day);
        } else {
            self.reserved.insert(day, reserved);
        }
    }

    /// Hand the whole selection to the caller and start over empty.
    pub fn take(&mut self) -> SelectionSet {
        std::mem::take(&mut self.selections)
    }
}
