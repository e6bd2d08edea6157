//! Conversions between hour ranges on a day and absolute timestamps.
//!
//! The API speaks in instants; the engine speaks in whole local hours. Both
//! directions go through the caller's time zone.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::engine::EngineError;
use crate::limits::*;
use crate::model::*;

/// Instant at which hour boundary `boundary` (`0..=24`) of `day` begins in `tz`.
///
/// Ambiguous local times (DST fall-back) resolve to the earliest instant;
/// nonexistent ones (DST spring-forward) are an error.
pub fn boundary_instant<Tz: TimeZone>(
    tz: &Tz,
    day: DayKey,
    boundary: u8,
) -> Result<DateTime<Utc>, EngineError> {
    if boundary > HOURS_PER_DAY {
        return Err(EngineError::InvalidArgument(format!(
            "hour boundary {boundary} outside 0-{HOURS_PER_DAY}"
        )));
    }
    let midnight: NaiveDateTime = day.and_time(chrono::NaiveTime::MIN);
    let local = midnight + Duration::hours(boundary as i64);
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(EngineError::InvalidArgument(format!(
            "{local} does not exist in the local time zone"
        ))),
    }
}

/// Start/end instants for a selected range: `[start:00, (end+1):00)`.
pub fn range_instants<Tz: TimeZone>(
    tz: &Tz,
    day: DayKey,
    range: &HourRange,
) -> Result<(DateTime<Utc>, DateTime<Utc>), EngineError> {
    let start = boundary_instant(tz, day, range.start)?;
    let end = boundary_instant(tz, day, range.end.saturating_add(1))?;
    Ok((start, end))
}

/// One create-reservation body per contiguous range, ordered by day then hour.
pub fn plan_requests<Tz: TimeZone>(
    tz: &Tz,
    selection: &SelectionSet,
    rate: u32,
    court_id: u64,
) -> Result<Vec<(DayKey, HourRange, ReservationRequest)>, EngineError> {
    let mut planned = Vec::new();
    for (&day, day_selection) in selection {
        for range in day_selection.ranges() {
            let (start_date_time, end_date_time) = range_instants(tz, day, range)?;
            planned.push((
                day,
                *range,
                ReservationRequest {
                    start_date_time,
                    end_date_time,
                    rate,
                    court_id,
                },
            ));
        }
    }
    if planned.is_empty() {
        return Err(EngineError::EmptySelection);
    }
    Ok(planned)
}

/// Reserved hours of `day` covered by API reservation spans.
///
/// A span covers local hours `[hour(start), hour(end) - 1]`, clipped to the
/// day. Spans that miss the day or cover no whole hour are skipped.
pub fn reserved_ranges<Tz: TimeZone>(
    tz: &Tz,
    day: DayKey,
    spans: &[ReservedSpan],
) -> Vec<ReservedRange> {
    let mut ranges = Vec::with_capacity(spans.len());
    for span in spans {
        if span.end_date_time <= span.start_date_time {
            continue;
        }
        let start = span.start_date_time.with_timezone(tz);
        let end = span.end_date_time.with_timezone(tz);
        let start_day = start.date_naive();
        let end_day = end.date_naive();

        if start_day > day || end_day < day {
            continue;
        }
        let first = if start_day < day { 0 } else { start.hour() as u8 };
        let last = if end_day > day {
            MAX_HOUR
        } else {
            let end_hour = end.hour() as u8;
            // partial trailing hour still blocks that hour
            let end_hour = if end.minute() > 0 || end.second() > 0 { end_hour + 1 } else { end_hour };
            match end_hour.checked_sub(1) {
                Some(h) => h,
                None => continue,
            }
        };
        if let Ok(range) = ReservedRange::new(first, last.min(MAX_HOUR)) {
            ranges.push(range);
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn day(d: u32) -> DayKey {
        DayKey::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn span(a: DateTime<Utc>, b: DateTime<Utc>) -> ReservedSpan {
        ReservedSpan { start_date_time: a, end_date_time: b }
    }

    fn r(start: u8, end: u8) -> HourRange {
        HourRange::new(start, end).unwrap()
    }

    #[test]
    fn range_to_instants_utc() {
        let (s, e) = range_instants(&Utc, day(16), &r(19, 19)).unwrap();
        assert_eq!(s, utc(16, 19, 0));
        assert_eq!(e, utc(16, 20, 0));
    }

    #[test]
    fn last_hour_ends_next_midnight() {
        let (_, e) = range_instants(&Utc, day(16), &r(22, 23)).unwrap();
        assert_eq!(e, utc(17, 0, 0));
    }

    #[test]
    fn range_to_instants_with_offset() {
        let kathmandu = FixedOffset::east_opt(5 * 3600 + 45 * 60).unwrap();
        let (s, e) = range_instants(&kathmandu, day(16), &r(7, 8)).unwrap();
        assert_eq!(s, utc(16, 1, 15));
        assert_eq!(e, utc(16, 3, 15));
    }

    #[test]
    fn boundary_out_of_range() {
        assert!(boundary_instant(&Utc, day(16), 25).is_err());
    }

    #[test]
    fn plan_requests_one_per_range() {
        let mut selection = SelectionSet::new();
        selection.insert(day(17), DaySelection::from_merged(vec![r(8, 8)]));
        selection.insert(day(16), DaySelection::from_merged(vec![r(2, 4), r(9, 9)]));
        let planned = plan_requests(&Utc, &selection, 1000, 3).unwrap();
        assert_eq!(planned.len(), 3);
        assert_eq!(planned[0].0, day(16));
        assert_eq!(planned[0].1, r(2, 4));
        assert_eq!(planned[0].2.start_date_time, utc(16, 2, 0));
        assert_eq!(planned[0].2.end_date_time, utc(16, 5, 0));
        assert_eq!(planned[0].2.court_id, 3);
        assert_eq!(planned[2].0, day(17));
    }

    #[test]
    fn plan_requests_empty_selection() {
        let selection = SelectionSet::new();
        assert_eq!(plan_requests(&Utc, &selection, 1000, 1), Err(EngineError::EmptySelection));
    }

    #[test]
    fn reserved_span_to_hours() {
        let ranges = reserved_ranges(&Utc, day(16), &[span(utc(16, 10, 0), utc(16, 13, 0))]);
        assert_eq!(ranges, vec![ReservedRange::new(10, 12).unwrap()]);
    }

    #[test]
    fn reserved_span_partial_hour_blocks_it() {
        let ranges = reserved_ranges(&Utc, day(16), &[span(utc(16, 10, 30), utc(16, 11, 15))]);
        assert_eq!(ranges, vec![ReservedRange::new(10, 11).unwrap()]);
    }

    #[test]
    fn reserved_span_clipped_to_day() {
        let spans = [
            span(utc(15, 22, 0), utc(16, 2, 0)),
            span(utc(16, 22, 0), utc(17, 0, 0)),
            span(utc(16, 23, 0), utc(17, 3, 0)),
        ];
        let ranges = reserved_ranges(&Utc, day(16), &spans);
        assert_eq!(
            ranges,
            vec![
                ReservedRange::new(0, 1).unwrap(),
                ReservedRange::new(22, 23).unwrap(),
                ReservedRange::new(23, 23).unwrap(),
            ]
        );
    }

    #[test]
    fn reserved_span_other_days_skipped() {
        let spans = [
            span(utc(14, 10, 0), utc(14, 12, 0)),
            span(utc(15, 20, 0), utc(16, 0, 0)),
            span(utc(16, 12, 0), utc(16, 12, 0)),
        ];
        assert!(reserved_ranges(&Utc, day(16), &spans).is_empty());
    }

    #[test]
    fn reserved_span_uses_local_hours() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let ranges = reserved_ranges(&plus_two, day(16), &[span(utc(16, 8, 0), utc(16, 10, 0))]);
        assert_eq!(ranges, vec![ReservedRange::new(10, 11).unwrap()]);
    }
}
