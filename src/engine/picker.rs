use crate::limits::*;
use crate::model::*;

use super::{EngineError, SelectionEngine};

/// Two-step start/end time picker.
///
/// Times here are clock boundaries: start `9` and end `11` books 9:00-11:00,
/// i.e. the hour range `[9, 10]`. The end must come strictly after the start
/// and may be `24` (midnight closing the day).
#[derive(Debug, Clone)]
pub struct RangePicker {
    day: DayKey,
    start: Option<Hour>,
}

impl RangePicker {
    pub fn new(day: DayKey) -> Self {
        Self { day, start: None }
    }

    pub fn day(&self) -> DayKey {
        self.day
    }

    pub fn start(&self) -> Option<Hour> {
        self.start
    }

    pub fn pick_start(&mut self, engine: &SelectionEngine, hour: Hour) -> Result<(), EngineError> {
        if engine.is_reserved(self.day, hour) {
            return Err(EngineError::InvalidArgument(format!(
                "{} is already reserved",
                clock_label(hour.get())
            )));
        }
        self.start = Some(hour);
        Ok(())
    }

    /// End boundaries the picker offers: after the start, up to the first
    /// reserved hour. Empty until a start is picked.
    pub fn end_options(&self, engine: &SelectionEngine) -> Vec<u8> {
        let Some(start) = self.start else {
            return Vec::new();
        };
        let mut options = Vec::new();
        for end in (start.get() + 1)..=HOURS_PER_DAY {
            // end boundary `end` books hour `end - 1`
            let Ok(last) = Hour::new(end - 1) else { break };
            if engine.is_reserved(self.day, last) {
                break;
            }
            options.push(end);
        }
        options
    }

    /// Commit the range `[start, end - 1]` and reset the picker.
    pub fn pick_end(&mut self, engine: &mut SelectionEngine, end: u8) -> Result<HourRange, EngineError> {
        let start = self
            .start
            .ok_or_else(|| EngineError::InvalidArgument("pick a start time first".into()))?;
        if end <= start.get() {
            return Err(EngineError::InvalidArgument(format!(
                "end {} must be after start {}",
                clock_label(end),
                clock_label(start.get())
            )));
        }
        if end > HOURS_PER_DAY {
            return Err(EngineError::InvalidArgument(format!(
                "end boundary {end} outside 1-{HOURS_PER_DAY}"
            )));
        }
        if !self.end_options(engine).contains(&end) {
            return Err(EngineError::InvalidArgument(format!(
                "{} - {} crosses a reserved hour",
                clock_label(start.get()),
                clock_label(end)
            )));
        }
        let last = Hour::new(end - 1)?;
        let range = engine.add_range(self.day, start, last);
        self.start = None;
        Ok(range)
    }

    pub fn reset(&mut self) {
        self.start = None;
    }
}
