// src/clock.rs

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid time regex"));

/// Source of "now" for past-time checks. Injected so tests can pin the time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Reads the clock once and returns `(today, now)` as `YYYY-MM-DD` / `HH:MM`.
    fn today_and_now(&self) -> (String, String) {
        let now = self.now();
        (
            now.format("%Y-%m-%d").to_string(),
            now.format("%H:%M").to_string(),
        )
    }
}

/// Wall clock in the server's local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

#[cfg(test)]
impl FixedClock {
    /// `FixedClock::at("2025-06-10", "12:45")`
    pub fn at(date: &str, time: &str) -> Self {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("test date");
        let time = NaiveTime::parse_from_str(time, "%H:%M").expect("test time");
        FixedClock(date.and_time(time))
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// `YYYY-MM-DD` that also names a real calendar day.
pub fn is_iso_date(s: &str) -> bool {
    DATE_RE.is_match(s) && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Zero-padded 24-hour `HH:MM` that names a real clock time.
pub fn is_hhmm(s: &str) -> bool {
    TIME_RE.is_match(s) && NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

/// Past when the day is behind today, or it is today and the label is at or before now.
/// Labels are zero-padded, so string order is chronological order.
pub fn is_past(date: &str, time: &str, today: &str, now: &str) -> bool {
    date < today || (date == today && time <= now)
}
