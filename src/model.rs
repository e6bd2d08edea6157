use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::limits::*;

/// Calendar day with the time of day truncated; the grouping key for selections.
pub type DayKey = NaiveDate;

/// An hour of the day, `0..=23`. Construction is the only place hours are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Hour(u8);

impl Hour {
    pub fn new(hour: u8) -> Result<Self, EngineError> {
        if hour > MAX_HOUR {
            return Err(EngineError::InvalidArgument(format!(
                "hour {hour} outside 0-{MAX_HOUR}"
            )));
        }
        Ok(Self(hour))
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Hour {
    type Error = EngineError;

    fn try_from(hour: u8) -> Result<Self, Self::Error> {
        Hour::new(hour)
    }
}

impl From<Hour> for u8 {
    fn from(hour: Hour) -> u8 {
        hour.0
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed interval `[start, end]` of whole hours within one day.
///
/// Every value satisfies `start <= end <= 23`: outside the crate the only ways
/// in are the checked constructors and validated deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct HourRange {
    pub(crate) start: u8,
    pub(crate) end: u8,
}

/// Wire shape of both range types before validation.
#[derive(Deserialize)]
struct RawRange {
    start: u8,
    end: u8,
}

impl HourRange {
    /// Validates both hours and `start <= end`. Reversed pairs are rejected, not swapped.
    pub fn new(start: u8, end: u8) -> Result<Self, EngineError> {
        Hour::new(start)?;
        Hour::new(end)?;
        if end < start {
            return Err(EngineError::InvalidArgument(format!(
                "range end {end} before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(hour: Hour) -> Self {
        Self {
            start: hour.get(),
            end: hour.get(),
        }
    }

    /// Range covering both hours, whichever order they come in.
    pub fn spanning(a: Hour, b: Hour) -> Self {
        Self {
            start: a.get().min(b.get()),
            end: a.get().max(b.get()),
        }
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn duration_hours(&self) -> u8 {
        self.end - self.start + 1
    }

    pub fn contains(&self, hour: Hour) -> bool {
        self.start <= hour.get() && hour.get() <= self.end
    }

    pub fn overlaps(&self, other: &HourRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Overlapping or adjacent (`[2,4]` touches `[5,7]`). Hours are discrete.
    pub fn touches(&self, other: &HourRange) -> bool {
        self.start <= other.end.saturating_add(1) && other.start <= self.end.saturating_add(1)
    }

    pub fn hours(self) -> impl Iterator<Item = Hour> {
        (self.start..=self.end).map(Hour)
    }
}

impl TryFrom<RawRange> for HourRange {
    type Error = EngineError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        HourRange::new(raw.start, raw.end)
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", clock_label(self.start), clock_label(self.end.saturating_add(1)))
    }
}

/// Hours already booked by someone else. Kept apart from `HourRange` so it can
/// never end up in a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct ReservedRange {
    pub(crate) start: u8,
    pub(crate) end: u8,
}

impl ReservedRange {
    pub fn new(start: u8, end: u8) -> Result<Self, EngineError> {
        let range = HourRange::new(start, end)?;
        Ok(Self {
            start: range.start,
            end: range.end,
        })
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn duration_hours(&self) -> u8 {
        self.end - self.start + 1
    }

    pub fn contains(&self, hour: Hour) -> bool {
        self.start <= hour.get() && hour.get() <= self.end
    }

    pub fn overlaps(&self, range: &HourRange) -> bool {
        self.start <= range.end && range.start <= self.end
    }
}

impl TryFrom<RawRange> for ReservedRange {
    type Error = EngineError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        ReservedRange::new(raw.start, raw.end)
    }
}

/// Sorted, pairwise disjoint, non-adjacent ranges for one day.
///
/// Only the engine builds these, always through `merge_ranges`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaySelection(Vec<HourRange>);

impl DaySelection {
    pub(crate) fn from_merged(ranges: Vec<HourRange>) -> Self {
        Self(ranges)
    }

    pub fn ranges(&self) -> &[HourRange] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_hours(&self) -> u32 {
        self.0.iter().map(|r| r.duration_hours() as u32).sum()
    }
}

/// At most one entry per day; days without ranges are never stored.
pub type SelectionSet = BTreeMap<DayKey, DaySelection>;

// ── Submission types ─────────────────────────────────────────────

/// Where a submitted range stands with the reservation API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Confirmed { reservation_id: u64 },
    Failed { reason: String },
}

impl SubmissionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, SubmissionStatus::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SubmissionStatus::Failed { .. })
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Confirmed { reservation_id } => {
                write!(f, "confirmed (#{reservation_id})")
            }
            SubmissionStatus::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Body of the create-reservation call: one per contiguous selected range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub rate: u32,
    pub court_id: u64,
}

/// A reservation held by anyone, as the API reports it for a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSpan {
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedReservation {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Court {
    pub id: u64,
    pub court_name: String,
    #[serde(default)]
    pub court_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    pub hourly_rate: u32,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Status change for one submitted range, published on the notify hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub id: Ulid,
    pub day: DayKey,
    pub range: HourRange,
    pub status: SubmissionStatus,
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}: {}", self.id, day_label(self.day), self.range, self.status)
    }
}

// ── Display helpers ──────────────────────────────────────────────

/// Clock label for an hour boundary `0..=24` (`24` is the closing midnight).
pub fn clock_label(boundary: u8) -> String {
    let time = NaiveTime::from_hms_opt((boundary % HOURS_PER_DAY) as u32, 0, 0)
        .unwrap_or(NaiveTime::MIN);
    time.format("%-I:%M %p").to_string()
}

pub fn day_label(day: DayKey) -> String {
    day.format("%Y/%m/%d").to_string()
}
