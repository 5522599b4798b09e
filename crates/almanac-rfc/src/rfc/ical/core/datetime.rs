//! iCalendar DATE and DATE-TIME values as recurrence anchors (RFC 5545 §3.3.4, §3.3.5).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

use super::error::{RecurrenceError, RecurrenceResult};

/// UTC offset representation (e.g., +0530, -0800).
///
/// Stored as total seconds from UTC. Valid range is roughly ±14 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcOffset {
    /// Total seconds from UTC (positive = east, negative = west).
    seconds: i32,
}

impl UtcOffset {
    /// Creates a UTC offset from signed hours and minutes.
    ///
    /// Returns `None` if the offset is outside ±14:00.
    #[must_use]
    pub fn new(hours: i8, minutes: u8) -> Option<Self> {
        let magnitude = i32::from(hours.unsigned_abs()) * 3600 + i32::from(minutes) * 60;
        let seconds = if hours < 0 { -magnitude } else { magnitude };
        (-14 * 3600..=14 * 3600)
            .contains(&seconds)
            .then_some(Self { seconds })
    }

    /// Creates a UTC offset from total seconds.
    #[must_use]
    pub const fn from_seconds(seconds: i32) -> Self {
        Self { seconds }
    }

    /// Returns the offset as total seconds from UTC.
    #[must_use]
    pub const fn as_seconds(self) -> i32 {
        self.seconds
    }

    /// UTC offset (zero).
    pub const UTC: Self = Self { seconds: 0 };
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.seconds >= 0 { '+' } else { '-' };
        let hours = self.seconds.abs() / 3600;
        let minutes = (self.seconds.abs() % 3600) / 60;
        write!(f, "{sign}{hours:02}{minutes:02}")
    }
}

/// The zone a zoned DATE-TIME is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// UTC, written with the `Z` suffix.
    Utc,
    /// A fixed offset from UTC.
    Offset(UtcOffset),
    /// An IANA time zone (`TZID=Europe/Berlin`).
    Named(Tz),
}

impl Zone {
    /// Resolves an IANA identifier such as `America/New_York`.
    #[must_use]
    pub fn from_tzid(tzid: &str) -> Option<Self> {
        let trimmed = tzid.trim().trim_start_matches('/');
        if trimmed.eq_ignore_ascii_case("UTC") || trimmed.eq_ignore_ascii_case("Z") {
            return Some(Self::Utc);
        }
        Tz::from_str(trimmed).ok().map(Self::Named)
    }

    /// ## Summary
    /// Resolves a TZID parameter value.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::UnknownTimezone` if the identifier is not
    /// in the time zone database.
    pub fn resolve(tzid: &str) -> RecurrenceResult<Self> {
        Self::from_tzid(tzid).ok_or_else(|| RecurrenceError::UnknownTimezone(tzid.to_string()))
    }

    /// ## Summary
    /// Converts a wall-clock time in this zone to an instant.
    ///
    /// Inside a DST fold the earlier instant is chosen. Inside a DST gap the
    /// offset in force before the gap is applied (RFC 5545 §3.3.5). Results
    /// past the edge of chrono's range saturate.
    #[must_use]
    pub fn to_utc(self, local: NaiveDateTime) -> DateTime<Utc> {
        match self {
            Self::Utc => local.and_utc(),
            Self::Offset(offset) => shift(local, -i64::from(offset.as_seconds())).and_utc(),
            Self::Named(tz) => match tz.from_local_datetime(&local) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => {
                    let before = tz
                        .offset_from_utc_datetime(&shift(local, -SECONDS_PER_DAY))
                        .fix()
                        .local_minus_utc();
                    shift(local, -i64::from(before)).and_utc()
                }
            },
        }
    }

    /// Converts an instant to the wall-clock time of this zone.
    #[must_use]
    pub fn from_utc(self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::Utc => instant.naive_utc(),
            Self::Offset(offset) => shift(instant.naive_utc(), i64::from(offset.as_seconds())),
            Self::Named(tz) => instant.with_timezone(&tz).naive_local(),
        }
    }

    /// ## Summary
    /// Returns the wall-clock time this zone actually shows for `local`.
    ///
    /// A time inside a DST gap moves forward by the gap's length, so
    /// 02:30 on a spring-forward night becomes 03:30. Every other time is
    /// returned as is.
    #[must_use]
    pub fn canonical(self, local: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Utc | Self::Offset(_) => local,
            Self::Named(_) => self.from_utc(self.to_utc(local)),
        }
    }
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Adds `seconds`, saturating at chrono's range limits.
fn shift(local: NaiveDateTime, seconds: i64) -> NaiveDateTime {
    local
        .checked_add_signed(TimeDelta::seconds(seconds))
        .unwrap_or(if seconds < 0 {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        })
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("UTC"),
            Self::Offset(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Date/time variant of a [`Temporal`].
///
/// Values of different variants cannot be compared. Two `Zoned` kinds with
/// different zones are the same variant: both denote instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Date,
    Floating,
    Zoned(Zone),
}

impl TemporalKind {
    /// Returns whether `other` belongs to the same date/time variant.
    #[must_use]
    pub const fn same_variant(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Date, Self::Date)
                | (Self::Floating, Self::Floating)
                | (Self::Zoned(_), Self::Zoned(_))
        )
    }

    /// ## Summary
    /// Expresses `value` as a wall-clock time in this kind's frame.
    ///
    /// Zoned values are converted into this kind's zone and come back in
    /// [canonical](Zone::canonical) form. Returns `None` when the variants
    /// differ.
    #[must_use]
    pub fn localize(self, value: &Temporal) -> Option<NaiveDateTime> {
        match (self, value) {
            (Self::Date, Temporal::Date(date)) => Some(date.and_time(NaiveTime::MIN)),
            (Self::Floating, Temporal::Floating(local)) => Some(*local),
            (Self::Zoned(target), Temporal::Zoned(local, zone)) => {
                Some(target.from_utc(zone.to_utc(*local)))
            }
            _ => None,
        }
    }

    /// Canonical form of a wall-clock time in this kind's frame.
    #[must_use]
    pub fn canonical(self, local: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Zoned(zone) => zone.canonical(local),
            Self::Date | Self::Floating => local,
        }
    }

    /// Builds a value of this kind from a wall-clock time.
    #[must_use]
    pub fn materialize(self, local: NaiveDateTime) -> Temporal {
        match self {
            Self::Date => Temporal::Date(local.date()),
            Self::Floating => Temporal::Floating(local),
            Self::Zoned(zone) => Temporal::Zoned(local, zone),
        }
    }
}

impl fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date => f.write_str("DATE"),
            Self::Floating => f.write_str("floating DATE-TIME"),
            Self::Zoned(zone) => write!(f, "DATE-TIME in {zone}"),
        }
    }
}

/// A DATE or DATE-TIME value: recurrence anchors (DTSTART), UNTIL, RDATE,
/// EXDATE and RECURRENCE-ID values all use this type.
///
/// Zoned values are equal, hashed and ordered by the instant they denote,
/// whatever zone they are written in. Values of different variants are
/// never equal and do not compare.
#[derive(Debug, Clone, Copy)]
pub enum Temporal {
    /// Date-only value (`VALUE=DATE`).
    Date(NaiveDate),
    /// Local time with no zone, the same wall-clock time everywhere.
    Floating(NaiveDateTime),
    /// Wall-clock time in a zone (UTC, fixed offset or TZID).
    Zoned(NaiveDateTime, Zone),
}

impl Temporal {
    /// Creates a date-only value.
    #[must_use]
    pub fn ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::Date)
    }

    /// Creates a floating DATE-TIME.
    #[must_use]
    pub fn floating_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .map(Self::Floating)
    }

    /// Creates a UTC DATE-TIME.
    #[must_use]
    pub fn utc_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        Self::zoned_ymd_hms(year, month, day, hour, minute, second, Zone::Utc)
    }

    /// Creates a zoned DATE-TIME.
    #[must_use]
    #[expect(
        clippy::too_many_arguments,
        reason = "Constructor mirrors RFC 5545 DATE-TIME components plus zone"
    )]
    pub fn zoned_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        zone: Zone,
    ) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .map(|local| Self::Zoned(local, zone))
    }

    /// Returns the date/time variant of this value.
    #[must_use]
    pub const fn kind(&self) -> TemporalKind {
        match self {
            Self::Date(_) => TemporalKind::Date,
            Self::Floating(_) => TemporalKind::Floating,
            Self::Zoned(_, zone) => TemporalKind::Zoned(*zone),
        }
    }

    /// Returns the wall-clock value; dates are placed at midnight.
    #[must_use]
    pub fn local(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN),
            Self::Floating(local) | Self::Zoned(local, _) => *local,
        }
    }

    /// Returns the instant for zoned values.
    #[must_use]
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Zoned(local, zone) => Some(zone.to_utc(*local)),
            Self::Date(_) | Self::Floating(_) => None,
        }
    }
}

impl PartialEq for Temporal {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl Eq for Temporal {}

impl Hash for Temporal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Date(date) => {
                state.write_u8(0);
                date.hash(state);
            }
            Self::Floating(local) => {
                state.write_u8(1);
                local.hash(state);
            }
            Self::Zoned(local, zone) => {
                state.write_u8(2);
                zone.to_utc(*local).hash(state);
            }
        }
    }
}

impl PartialOrd for Temporal {
    /// Values are ordered only within one variant; zoned values are ordered
    /// by instant.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Floating(a), Self::Floating(b)) => Some(a.cmp(b)),
            (Self::Zoned(a, za), Self::Zoned(b, zb)) => Some(za.to_utc(*a).cmp(&zb.to_utc(*b))),
            _ => None,
        }
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y%m%d")),
            Self::Floating(local) => write!(f, "{}", local.format("%Y%m%dT%H%M%S")),
            Self::Zoned(local, Zone::Utc) => write!(f, "{}Z", local.format("%Y%m%dT%H%M%S")),
            Self::Zoned(local, zone) => {
                write!(f, "TZID={zone}:{}", local.format("%Y%m%dT%H%M%S"))
            }
        }
    }
}
