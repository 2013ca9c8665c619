//! Interval allocation.
//!
//! This module turns one converted schedule span into per-bucket minutes
//! and a per-state contribution. The authoritative source duration sets
//! the total; the converted span only decides where those minutes land:
//!
//! 1. Both endpoints are converted into the reference zone, with any day
//!    offset applied to the source date first. The span is the elapsed
//!    time between the two instants.
//! 2. With a target date, the wall-clock range is clamped to that date.
//! 3. Every bucket gets `overlap * source_duration / range` minutes, where
//!    `range` is the wall-clock length of the span. It differs from the
//!    elapsed span only when the reference zone changes offset inside it.
//! 4. The state total gets the source duration as-is unless the span was
//!    clamped, in which case it gets the clamped share.

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;

use crate::models::{BucketAllocation, MINUTES_PER_DAY, TimeBucket};
use crate::parse::parse_duration_minutes;
use crate::tz::{ConvertedTime, convert_to_reference};

/// A schedule span in its source zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub date: NaiveDate,
    pub zone: Tz,
    pub start_minutes: u32,
    pub start_day_offset: u32,
    pub end_minutes: u32,
    pub end_day_offset: u32,
}

/// A schedule span carried into the reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSpan {
    pub start: ConvertedTime,
    pub end: ConvertedTime,
    /// Elapsed minutes from start to end, at least 1.
    pub span_minutes: i64,
}

/// Result of allocating one span.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub source_duration_minutes: i64,
    pub reference_span_minutes: i64,
    pub allocation_scale: f64,
    /// Bucket-range start, minutes after the anchor date's midnight.
    pub clamped_start: u32,
    /// Bucket-range end (exclusive).
    pub clamped_end: u32,
    pub was_clamped: bool,
    /// Non-zero bucket allocations, in bucket order.
    pub buckets: Vec<BucketAllocation>,
    /// Minutes to add to the state total.
    pub state_minutes: f64,
}

impl Allocation {
    /// `reference_span_minutes - source_duration_minutes`.
    pub fn duration_difference(&self) -> i64 {
        self.reference_span_minutes - self.source_duration_minutes
    }
}

/// Length of the intersection of `[start, end)` with a bucket.
///
/// `end < start` means the range crosses midnight. Minutes past midnight
/// fold back onto the same time-of-day bucket, so for a range shorter
/// than a day the overlaps over a gap-free bucket set sum to `end - start`.
pub fn overlap_minutes(start: u32, end: u32, bucket_start: u32, bucket_end: u32) -> u32 {
    let end = if end < start { end + MINUTES_PER_DAY } else { end };
    intersect(start, end, bucket_start, bucket_end)
        + intersect(
            start,
            end,
            bucket_start + MINUTES_PER_DAY,
            bucket_end + MINUTES_PER_DAY,
        )
}

fn intersect(start: u32, end: u32, bucket_start: u32, bucket_end: u32) -> u32 {
    let lo = start.max(bucket_start);
    let hi = end.min(bucket_end);
    hi.saturating_sub(lo)
}

/// Convert both endpoints of `span` into `reference`.
pub fn convert_span(span: &SourceSpan, reference: Tz) -> ReferenceSpan {
    let start_date = shift_date(span.date, span.start_day_offset);
    let end_date = shift_date(span.date, span.end_day_offset);

    let start = convert_to_reference(span.start_minutes, span.zone, start_date, reference);
    let mut end = convert_to_reference(span.end_minutes, span.zone, end_date, reference);
    if end.instant <= start.instant {
        let next_day = shift_date(end_date, 1);
        end = convert_to_reference(span.end_minutes, span.zone, next_day, reference);
    }

    let span_minutes = (end.instant - start.instant).num_minutes();

    ReferenceSpan {
        start,
        end,
        span_minutes: span_minutes.max(1),
    }
}

fn shift_date(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(date)
}

/// Minutes of `time` measured from midnight of `anchor`.
fn absolute_minutes(time: &ConvertedTime, anchor: NaiveDate) -> i64 {
    (time.date - anchor).num_days() * i64::from(MINUTES_PER_DAY) + i64::from(time.minutes)
}

/// Wall-clock range of the span in minutes from midnight of `anchor`.
fn wall_range(span: &ReferenceSpan, anchor: NaiveDate) -> (i64, i64) {
    let start = absolute_minutes(&span.start, anchor);
    let end = absolute_minutes(&span.end, anchor);
    // A repeated fall-back hour can put the wall-clock end before the start.
    let end = if end > start {
        end
    } else {
        start + span.span_minutes
    };
    (start, end)
}

/// Whether the converted span touches `target` at all.
pub fn overlaps_date(span: &ReferenceSpan, target: NaiveDate) -> bool {
    let (start, end) = wall_range(span, target);
    start < i64::from(MINUTES_PER_DAY) && end > 0
}

/// Allocate a converted span across the day's buckets.
///
/// `duration` is the authoritative source duration string; when it does
/// not parse, the converted span stands in for it. Returns `None` when a
/// `target` is given and the span does not touch it.
pub fn allocate(
    span: &ReferenceSpan,
    duration: Option<&str>,
    target: Option<NaiveDate>,
) -> Option<Allocation> {
    let reference_span_minutes = span.span_minutes;
    let source_duration_minutes = duration
        .and_then(parse_duration_minutes)
        .unwrap_or(reference_span_minutes);
    let allocation_scale = source_duration_minutes as f64 / reference_span_minutes as f64;

    let (start, end) = wall_range(span, target.unwrap_or(span.start.date));
    let wall_minutes = end - start;
    let prorate = |minutes: u32| {
        f64::from(minutes) * source_duration_minutes as f64 / wall_minutes as f64
    };

    let day = i64::from(MINUTES_PER_DAY);
    let (clamped_start, clamped_end, was_clamped) = match target {
        Some(target) => {
            if !overlaps_date(span, target) {
                return None;
            }
            let clamped_start = start.clamp(0, day);
            let clamped_end = end.clamp(0, day);
            (
                clamped_start as u32,
                clamped_end as u32,
                clamped_start != start || clamped_end != end,
            )
        }
        None => {
            let start = span.start.minutes;
            let length = wall_minutes.min(day) as u32;
            (start, start + length, false)
        }
    };

    let buckets = TimeBucket::day()
        .iter()
        .filter_map(|bucket| {
            let overlap = overlap_minutes(
                clamped_start,
                clamped_end,
                bucket.start_minutes,
                bucket.end_minutes,
            );
            (overlap > 0).then(|| BucketAllocation {
                index: bucket.index,
                minutes: prorate(overlap),
            })
        })
        .collect();

    let state_minutes = if was_clamped {
        prorate(clamped_end - clamped_start)
    } else {
        source_duration_minutes as f64
    };

    Some(Allocation {
        source_duration_minutes,
        reference_span_minutes,
        allocation_scale,
        clamped_start,
        clamped_end,
        was_clamped,
        buckets,
        state_minutes,
    })
}
