use crate::model::*;

// ── Range algebra over whole hours ────────────────────────────────

/// Sort by start and fold overlapping *or adjacent* ranges together.
///
/// `[2,4]` and `[5,7]` become `[2,7]`: hours are discrete, so touching
/// ranges describe one contiguous block.
pub fn merge_ranges(ranges: &[HourRange]) -> Vec<HourRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.start);

    let mut merged: Vec<HourRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        if let Some(last) = merged.last_mut()
            && range.start <= last.end.saturating_add(1)
        {
            last.end = last.end.max(range.end);
            continue;
        }
        merged.push(range);
    }
    merged
}

/// Remove one hour from a merged range list.
///
/// A single-hour range disappears, a boundary hour shrinks its range, and an
/// interior hour splits its range in two. Ranges not containing `hour` are kept.
pub fn remove_hour(ranges: &[HourRange], hour: Hour) -> Vec<HourRange> {
    let h = hour.get();
    let mut result = Vec::with_capacity(ranges.len() + 1);
    for &range in ranges {
        if !range.contains(hour) {
            result.push(range);
        } else if range.start == h && range.end == h {
            // dropped
        } else if range.start == h {
            result.push(HourRange { start: h + 1, end: range.end });
        } else if range.end == h {
            result.push(HourRange { start: range.start, end: h - 1 });
        } else {
            result.push(HourRange { start: range.start, end: h - 1 });
            result.push(HourRange { start: h + 1, end: range.end });
        }
    }
    merge_ranges(&result)
}

/// Hours of `base` not covered by any reserved range. `base` must be merged.
pub fn subtract_reserved(base: &[HourRange], reserved: &[ReservedRange]) -> Vec<HourRange> {
    let blocked: Vec<HourRange> = reserved
        .iter()
        .map(|r| HourRange { start: r.start, end: r.end })
        .collect();
    let blocked = merge_ranges(&blocked);

    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;

        while ri < blocked.len() && blocked[ri].end < current_start {
            ri += 1;
        }

        let mut covered_to_end = false;
        let mut j = ri;
        while j < blocked.len() && blocked[j].start <= b.end {
            let r = blocked[j];
            if r.start > current_start {
                result.push(HourRange { start: current_start, end: r.start - 1 });
            }
            if r.end >= b.end {
                covered_to_end = true;
                break;
            }
            current_start = current_start.max(r.end + 1);
            j += 1;
        }

        if !covered_to_end && current_start <= b.end {
            result.push(HourRange { start: current_start, end: b.end });
        }
    }

    result
}

/// True when `ranges` is sorted, pairwise disjoint and non-adjacent.
pub fn is_normalized(ranges: &[HourRange]) -> bool {
    ranges.iter().all(|r| r.start <= r.end && r.end <= crate::limits::MAX_HOUR)
        && ranges.windows(2).all(|w| w[0].end.saturating_add(1) < w[1].start)
}
