use crate::limits::*;
use crate::model::*;

use super::merge::subtract_reserved;
use super::SelectionEngine;

impl SelectionEngine {
    /// True if `hour` falls inside any reserved range supplied for `day`.
    pub fn is_reserved(&self, day: DayKey, hour: Hour) -> bool {
        self.day_reserved(day).iter().any(|r| r.contains(hour))
    }

    pub fn is_selected(&self, day: DayKey, hour: Hour) -> bool {
        self.day_ranges(day).iter().any(|r| r.contains(hour))
    }

    /// Whether the UI may offer `hour` at all. Reserved hours are never
    /// selectable, whatever the selection currently holds.
    pub fn is_selectable(&self, day: DayKey, hour: Hour) -> bool {
        !self.is_reserved(day, hour)
    }

    /// True if no hour of `range` is reserved.
    pub fn is_range_free(&self, day: DayKey, range: &HourRange) -> bool {
        !self.day_reserved(day).iter().any(|r| r.overlaps(range))
    }

    pub fn has_selection(&self, day: DayKey) -> bool {
        self.selections.contains_key(&day)
    }

    /// Merged ranges for the day, empty if nothing is selected.
    pub fn ranges(&self, day: DayKey) -> &[HourRange] {
        self.day_ranges(day)
    }

    pub fn reserved(&self, day: DayKey) -> &[ReservedRange] {
        self.day_reserved(day)
    }

    /// Unreserved blocks of the day.
    pub fn free_ranges(&self, day: DayKey) -> Vec<HourRange> {
        let whole_day = [HourRange { start: 0, end: MAX_HOUR }];
        subtract_reserved(&whole_day, self.day_reserved(day))
    }

    /// Days with a selection, ascending.
    pub fn days(&self) -> impl Iterator<Item = DayKey> + '_ {
        self.selections.keys().copied()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selections
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Selected hours across all days.
    pub fn total_hours(&self) -> u32 {
        self.selections.values().map(DaySelection::total_hours).sum()
    }
}
