//! Service-day time handling.
//!
//! Timetables and queries express instants as "HH:MM" or "HH:MM:SS" on a
//! single service day. Internally an instant is a count of seconds since
//! midnight, which keeps comparisons and slack arithmetic exact.

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

const SECS_PER_MINUTE: u32 = 60;
const SECS_PER_HOUR: u32 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u32 = 24 * SECS_PER_HOUR;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// An instant on the service day, with one-second resolution.
///
/// # Examples
///
/// ```
/// use robust_planner::domain::ServiceTime;
///
/// let t = ServiceTime::parse("08:05").unwrap();
/// assert_eq!(t.to_string(), "08:05");
/// assert_eq!(t.hour(), 8);
///
/// let precise = ServiceTime::parse("08:05:30").unwrap();
/// assert_eq!(precise.to_string(), "08:05:30");
/// assert!(precise > t);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServiceTime(u32);

impl ServiceTime {
    /// Midnight at the start of the service day.
    pub const MIDNIGHT: ServiceTime = ServiceTime(0);

    /// Create a time from hour, minute and second components.
    ///
    /// Returns `None` if any component is out of range.
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(Self(hour * SECS_PER_HOUR + minute * SECS_PER_MINUTE + second))
    }

    /// Create a time from seconds since midnight.
    ///
    /// Returns `None` past the end of the day.
    pub fn from_secs(secs: u32) -> Option<Self> {
        (secs < SECS_PER_DAY).then_some(Self(secs))
    }

    /// Parse a time from "HH:MM" or "HH:MM:SS" format.
    ///
    /// # Examples
    ///
    /// ```
    /// use robust_planner::domain::ServiceTime;
    ///
    /// assert!(ServiceTime::parse("00:00").is_ok());
    /// assert!(ServiceTime::parse("23:59:59").is_ok());
    ///
    /// assert!(ServiceTime::parse("0800").is_err());
    /// assert!(ServiceTime::parse("8:00").is_err());
    /// assert!(ServiceTime::parse("24:00").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let bytes = s.as_bytes();

        if bytes.len() != 5 && bytes.len() != 8 {
            return Err(TimeError::new("expected HH:MM or HH:MM:SS format"));
        }
        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let second = if bytes.len() == 8 {
            if bytes[5] != b':' {
                return Err(TimeError::new("expected colon at position 5"));
            }
            let second = parse_two_digits(&bytes[6..8])
                .ok_or_else(|| TimeError::new("invalid second digits"))?;
            if second > 59 {
                return Err(TimeError::new("second must be 0-59"));
            }
            second
        } else {
            0
        };

        Self::from_hms(hour, minute, second).ok_or_else(|| TimeError::new("invalid time"))
    }

    /// Seconds since midnight.
    pub fn as_secs(&self) -> u32 {
        self.0
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u32 {
        self.0 / SECS_PER_HOUR
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        (self.0 % SECS_PER_HOUR) / SECS_PER_MINUTE
    }

    /// Returns the second (0-59).
    pub fn second(&self) -> u32 {
        self.0 % SECS_PER_MINUTE
    }

    /// Add a duration, returning `None` if the result leaves the service day.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let secs = i64::from(self.0).checked_add(duration.num_seconds())?;
        u32::try_from(secs).ok().and_then(Self::from_secs)
    }

    /// Subtract a duration, returning `None` if the result is before midnight.
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        let secs = i64::from(self.0).checked_sub(duration.num_seconds())?;
        u32::try_from(secs).ok().and_then(Self::from_secs)
    }

    /// Subtract a duration, clamping at midnight.
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        self.checked_sub(duration).unwrap_or(Self::MIDNIGHT)
    }

    /// Returns the duration between two times.
    ///
    /// Returns a negative duration if `other` is after `self`.
    pub fn signed_duration_since(&self, other: Self) -> Duration {
        Duration::seconds(i64::from(self.0) - i64::from(other.0))
    }
}

impl Sub for ServiceTime {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.signed_duration_since(rhs)
    }
}

impl FromStr for ServiceTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ServiceTime({:02}:{:02}:{:02})",
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

impl fmt::Display for ServiceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.second() == 0 {
            write!(f, "{:02}:{:02}", self.hour(), self.minute())
        } else {
            write!(
                f,
                "{:02}:{:02}:{:02}",
                self.hour(),
                self.minute(),
                self.second()
            )
        }
    }
}

impl Serialize for ServiceTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The part of the service day in which connections may depart.
///
/// The window is half-open: `start` is eligible, `end` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingWindow {
    pub start: ServiceTime,
    pub end: ServiceTime,
}

impl OperatingWindow {
    pub fn new(start: ServiceTime, end: ServiceTime) -> Self {
        Self { start, end }
    }

    /// Returns true if `time` falls inside the window.
    pub fn contains(&self, time: ServiceTime) -> bool {
        self.start <= time && time < self.end
    }
}

impl Default for OperatingWindow {
    fn default() -> Self {
        Self {
            start: ServiceTime(6 * SECS_PER_HOUR),
            end: ServiceTime(22 * SECS_PER_HOUR),
        }
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(s: &str) -> ServiceTime {
        ServiceTime::parse(s).unwrap()
    }

    #[test]
    fn parse_valid_times() {
        let time = t("00:00");
        assert_eq!(time.as_secs(), 0);

        let time = t("23:59");
        assert_eq!(time.hour(), 23);
        assert_eq!(time.minute(), 59);

        let time = t("14:30:15");
        assert_eq!(time.hour(), 14);
        assert_eq!(time.minute(), 30);
        assert_eq!(time.second(), 15);
    }

    #[test]
    fn parse_invalid_format() {
        assert!(ServiceTime::parse("1430").is_err());
        assert!(ServiceTime::parse("14:3").is_err());
        assert!(ServiceTime::parse("14-30").is_err());
        assert!(ServiceTime::parse("14:30-00").is_err());
        assert!(ServiceTime::parse("ab:cd").is_err());
        assert!(ServiceTime::parse("").is_err());
    }

    #[test]
    fn parse_out_of_range() {
        assert!(ServiceTime::parse("24:00").is_err());
        assert!(ServiceTime::parse("12:60").is_err());
        assert!(ServiceTime::parse("12:00:60").is_err());
    }

    #[test]
    fn display_omits_zero_seconds() {
        assert_eq!(t("08:05").to_string(), "08:05");
        assert_eq!(t("08:05:09").to_string(), "08:05:09");
        assert_eq!(format!("{:?}", t("08:05")), "ServiceTime(08:05:00)");
    }

    #[test]
    fn arithmetic() {
        let time = t("08:00");
        assert_eq!(time.checked_add(Duration::minutes(90)), Some(t("09:30")));
        assert_eq!(time.checked_sub(Duration::seconds(90)), Some(t("07:58:30")));
        assert_eq!(t("23:30").checked_add(Duration::hours(1)), None);
        assert_eq!(t("00:30").checked_sub(Duration::hours(1)), None);
        assert_eq!(
            t("00:30").saturating_sub(Duration::hours(1)),
            ServiceTime::MIDNIGHT
        );
    }

    #[test]
    fn difference_is_signed() {
        assert_eq!(t("09:00") - t("08:20"), Duration::minutes(40));
        assert_eq!(t("08:20") - t("09:00"), Duration::minutes(-40));
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&t("06:00")).unwrap();
        assert_eq!(json, "\"06:00\"");

        let back: ServiceTime = serde_json::from_str("\"21:59:30\"").unwrap();
        assert_eq!(back, t("21:59:30"));

        assert!(serde_json::from_str::<ServiceTime>("\"25:00\"").is_err());
    }

    #[test]
    fn default_window_is_half_open() {
        let window = OperatingWindow::default();
        assert_eq!(window.start, t("06:00"));
        assert_eq!(window.end, t("22:00"));
        assert!(window.contains(t("06:00")));
        assert!(window.contains(t("21:59:59")));
        assert!(!window.contains(t("22:00")));
        assert!(!window.contains(t("05:59")));
    }

    proptest! {
        #[test]
        fn display_parse_roundtrip(secs in 0u32..86_400) {
            let time = ServiceTime::from_secs(secs).unwrap();
            prop_assert_eq!(ServiceTime::parse(&time.to_string()).unwrap(), time);
        }

        #[test]
        fn ordering_matches_seconds(a in 0u32..86_400, b in 0u32..86_400) {
            let ta = ServiceTime::from_secs(a).unwrap();
            let tb = ServiceTime::from_secs(b).unwrap();
            prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
        }
    }
}
