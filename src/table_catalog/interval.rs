//! Half-open time intervals in the canonical ISO/UTC calendar
//!
//! Every interval attached to a [`TimeSeriesTable`](super::TimeSeriesTable)
//! must be expressed in UTC. Intervals built in-process from `DateTime<Utc>`
//! are canonical by construction; [`Interval::parse`] is the boundary where
//! externally supplied literals are checked and rejected with a recoverable
//! error.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interval used when a table declares no time bounds: 1900-01-01 to 3000-01-01 UTC.
pub static DEFAULT_INTERVAL: LazyLock<Interval> = LazyLock::new(|| Interval {
    start: Utc
        .with_ymd_and_hms(1900, 1, 1, 0, 0, 0)
        .unwrap()
        .fixed_offset(),
    end: Utc
        .with_ymd_and_hms(3000, 1, 1, 0, 0, 0)
        .unwrap()
        .fixed_offset(),
});

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntervalError {
    #[error("interval end {end} is before start {start}")]
    EndBeforeStart { start: String, end: String },
    #[error("interval {interval} is not expressed in the UTC calendar")]
    CalendarMismatch { interval: String },
    #[error("malformed interval literal '{literal}': {reason}")]
    Malformed { literal: String, reason: String },
}

/// Calendar system an interval's endpoints are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chronology {
    /// ISO calendar, UTC (offset zero)
    IsoUtc,
    /// ISO calendar with a fixed, non-zero UTC offset
    Iso { offset_seconds: i32 },
}

/// A half-open time range `[start, end)`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl Interval {
    /// Create an interval from endpoints in any time zone.
    ///
    /// The offset of each endpoint is kept, so an interval built from a
    /// non-UTC zone reports a non-canonical [`Chronology`].
    pub fn new<Tz: TimeZone>(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self, IntervalError> {
        let start = start.fixed_offset();
        let end = end.fixed_offset();
        if end < start {
            return Err(IntervalError::EndBeforeStart {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Interval { start, end })
    }

    /// Create a canonical UTC interval
    pub fn utc(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        Self::new(start, end)
    }

    /// Create a canonical UTC interval from epoch milliseconds
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Result<Self, IntervalError> {
        let to_utc = |ms: i64| {
            Utc.timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| IntervalError::Malformed {
                    literal: format!("{}/{}", start_ms, end_ms),
                    reason: format!("{} ms is out of range", ms),
                })
        };
        Self::utc(to_utc(start_ms)?, to_utc(end_ms)?)
    }

    /// Parse an ISO-8601 interval literal of the form `start/end`.
    ///
    /// Each endpoint is either an RFC 3339 timestamp or a bare `YYYY-MM-DD`
    /// date (read as midnight UTC). Endpoints carrying a non-zero offset are
    /// rejected with [`IntervalError::CalendarMismatch`].
    pub fn parse(literal: &str) -> Result<Self, IntervalError> {
        let malformed = |reason: &str| IntervalError::Malformed {
            literal: literal.to_string(),
            reason: reason.to_string(),
        };

        let (start, end) = literal
            .trim()
            .split_once('/')
            .ok_or_else(|| malformed("expected '<start>/<end>'"))?;
        let start = parse_endpoint(start).ok_or_else(|| malformed("invalid start timestamp"))?;
        let end = parse_endpoint(end).ok_or_else(|| malformed("invalid end timestamp"))?;

        let interval = Self::new(start, end)?;
        if !interval.is_canonical_utc() {
            return Err(IntervalError::CalendarMismatch {
                interval: literal.to_string(),
            });
        }
        Ok(interval)
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn chronology(&self) -> Chronology {
        match (
            self.start.offset().local_minus_utc(),
            self.end.offset().local_minus_utc(),
        ) {
            (0, 0) => Chronology::IsoUtc,
            (0, offset_seconds) | (offset_seconds, _) => Chronology::Iso { offset_seconds },
        }
    }

    pub fn is_canonical_utc(&self) -> bool {
        self.chronology() == Chronology::IsoUtc
    }

    /// True if `instant` falls in `[start, end)`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

fn parse_endpoint(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset())
}

/// Equal when both endpoints denote the same instants in the same calendar
impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.chronology() == other.chronology()
    }
}

impl Eq for Interval {}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }
}

impl TryFrom<String> for Interval {
    type Error = IntervalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Interval::parse(&value)
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.to_string()
    }
}
