//! Weekly schedule windows, clock times, and candidate slots.

use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::LazyLock;

static CLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2}):(\d{2})(?::(\d{2}))?\s*$").unwrap());
static SLOT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2}:\d{2}(?::\d{2})?)\s*-\s*(\d{1,2}:\d{2}(?::\d{2})?)\s*$").unwrap()
});

/// Day of the week a window repeats on. The API uses lowercase English names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Wire name of the day (`"monday"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }

    /// The weekday a calendar date falls on.
    pub fn of_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl Display for DayOfWeek {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.pad(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|d| d.as_str() == lower || d.as_str()[..3] == lower)
            .ok_or_else(|| format!("unknown day of week: {s}"))
    }
}

/// A wall-clock time with minute granularity.
///
/// Parses `HH:MM` and `HH:MM:SS` (the API returns seconds, which are dropped).
/// Always renders as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn new(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(TimeOfDay(hour * 60 + minute))
    }

    /// Const constructor for literal times.
    ///
    /// # Panics
    /// If `hour` is 24 or more or `minute` is 60 or more. Use [`TimeOfDay::new`]
    /// for values that are not known to be in range.
    pub const fn hm(hour: u16, minute: u16) -> Self {
        assert!(hour < 24 && minute < 60, "time of day out of range");
        TimeOfDay(hour * 60 + minute)
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CLOCK_REGEX
            .captures(s)
            .ok_or_else(|| format!("invalid time: {s:?}"))?;
        let hour: u16 = caps[1].parse().map_err(|_| format!("invalid hour: {s:?}"))?;
        let minute: u16 = caps[2]
            .parse()
            .map_err(|_| format!("invalid minute: {s:?}"))?;
        TimeOfDay::new(hour, minute).ok_or_else(|| format!("time out of range: {s:?}"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// True when the range has positive length.
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Overlap test used for every window conflict check.
    ///
    /// Catches partial overlap, containment in either direction, and exact
    /// match. Ranges that only touch (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when `other` lies entirely inside this range.
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} - {}", self.start, self.end)
    }
}

impl FromStr for TimeRange {
    type Err = String;

    /// Parses the `"HH:MM - HH:MM"` time-slot form stored on requests.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SLOT_REGEX
            .captures(s)
            .ok_or_else(|| format!("invalid time slot: {s:?}"))?;
        Ok(TimeRange {
            start: caps[1].parse()?,
            end: caps[2].parse()?,
        })
    }
}

/// A recurring weekly window in which a professor takes advisories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleWindow {
    pub id: i64,
    #[serde(default)]
    pub professor_id: i64,
    #[serde(rename = "dayOfWeek")]
    pub day: DayOfWeek,
    #[serde(rename = "startTime")]
    pub start: TimeOfDay,
    #[serde(rename = "endTime")]
    pub end: TimeOfDay,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl ScheduleWindow {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// A window as entered by a professor, before the server assigns an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewWindow {
    pub day: DayOfWeek,
    pub range: TimeRange,
    pub is_available: bool,
}

impl NewWindow {
    pub fn new(day: DayOfWeek, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            day,
            range: TimeRange::new(start, end),
            is_available: true,
        }
    }
}

/// One bookable slot returned by the availability-by-date query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlot {
    pub id: i64,
    #[serde(rename = "dayOfWeek", default)]
    pub day: Option<DayOfWeek>,
    #[serde(rename = "startTime")]
    pub start: TimeOfDay,
    #[serde(rename = "endTime")]
    pub end: TimeOfDay,
}

impl AvailableSlot {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    /// The `"HH:MM - HH:MM"` string stored on a request when this slot is booked.
    pub fn time_slot(&self) -> String {
        self.range().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn test_literal_times() {
        assert_eq!(TimeOfDay::hm(23, 59).to_string(), "23:59");
        assert_eq!(TimeOfDay::new(24, 0), None);
    }

    #[test]
    #[should_panic(expected = "time of day out of range")]
    fn test_literal_time_out_of_range_panics() {
        let _ = TimeOfDay::hm(25, 0);
    }

    fn r(a: &str, b: &str) -> TimeRange {
        TimeRange::new(t(a), t(b))
    }

    #[test]
    fn test_time_parsing_drops_seconds() {
        assert_eq!(t("09:30:00"), t("09:30"));
        assert_eq!(t("7:05").to_string(), "07:05");
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("9h".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_overlap_policy() {
        let base = r("09:00", "10:00");
        assert!(base.overlaps(&r("09:30", "10:30")));
        assert!(base.overlaps(&r("08:30", "09:30")));
        assert!(base.overlaps(&r("09:00", "10:00")));
        assert!(base.overlaps(&r("09:15", "09:45")));
        assert!(base.overlaps(&r("08:00", "11:00")));
        assert!(!base.overlaps(&r("10:00", "11:00")));
        assert!(!base.overlaps(&r("08:00", "09:00")));
    }

    #[test]
    fn test_time_slot_round_trip_format() {
        let range: TimeRange = "09:00:00 - 10:30:00".parse().unwrap();
        assert_eq!(range.to_string(), "09:00 - 10:30");
        assert!("09:00".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_day_of_date() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(DayOfWeek::of_date(monday), DayOfWeek::Monday);
        assert_eq!("Wed".parse::<DayOfWeek>().unwrap(), DayOfWeek::Wednesday);
    }

    #[test]
    fn test_window_decodes_api_shape() {
        let json = r#"{"id":3,"dayOfWeek":"friday","startTime":"14:00:00","endTime":"15:00:00","isAvailable":false}"#;
        let window: ScheduleWindow = serde_json::from_str(json).unwrap();
        assert_eq!(window.day, DayOfWeek::Friday);
        assert_eq!(window.range().to_string(), "14:00 - 15:00");
        assert!(!window.is_available);
    }
}
