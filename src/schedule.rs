// src/schedule.rs

use serde::Serialize;

/// Working-day policy shared by slot resolution and the booking guards.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub start: String,
    pub end: String,
    pub step_min: u32,
    /// Times that can never be booked, with the reason shown to the client.
    pub blackout: Vec<(String, &'static str)>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start: "09:00".into(),
            end: "17:00".into(),
            step_min: 30,
            blackout: vec![("12:30".into(), "Lunch"), ("13:00".into(), "Lunch")],
        }
    }
}

impl ScheduleConfig {
    pub fn grid(&self) -> Vec<String> {
        generate_grid(&self.start, &self.end, self.step_min)
    }

    pub fn blackout_reason(&self, time: &str) -> Option<&'static str> {
        self.blackout
            .iter()
            .find(|(t, _)| t == time)
            .map(|(_, reason)| *reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

impl Period {
    pub fn of(time: &str) -> Self {
        let hour = time
            .split(':')
            .next()
            .and_then(|h| h.parse::<u32>().ok())
            .unwrap_or(0);
        match hour {
            h if h < 12 => Period::Morning,
            h if h < 17 => Period::Afternoon,
            _ => Period::Evening,
        }
    }
}

fn to_minutes(label: &str) -> Option<u32> {
    let (h, m) = label.split_once(':')?;
    h.parse::<u32>().ok()?.checked_mul(60)?.checked_add(m.parse::<u32>().ok()?)
}

/// Labels from `start` in `step_min` increments; a slot is emitted only if it
/// ends by `end`. Malformed bounds or a zero step yield an empty grid.
pub fn generate_grid(start: &str, end: &str, step_min: u32) -> Vec<String> {
    let (Some(start_min), Some(end_min)) = (to_minutes(start), to_minutes(end)) else {
        return vec![];
    };
    if step_min == 0 {
        return vec![];
    }

    let mut out = Vec::new();
    let mut m = start_min;
    while let Some(next) = m.checked_add(step_min).filter(|next| *next <= end_min) {
        out.push(format!("{:02}:{:02}", m / 60, m % 60));
        m = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_day_has_sixteen_half_hours() {
        let grid = ScheduleConfig::default().grid();
        assert_eq!(grid.len(), 16);
        assert_eq!(grid.first().map(String::as_str), Some("09:00"));
        assert_eq!(grid.last().map(String::as_str), Some("16:30"));
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn partial_trailing_step_is_dropped() {
        assert_eq!(
            generate_grid("09:00", "10:45", 30),
            vec!["09:00", "09:30", "10:00"]
        );
        assert_eq!(generate_grid("08:15", "09:00", 15), vec!["08:15", "08:30", "08:45"]);
    }

    #[test]
    fn degenerate_windows_are_empty() {
        assert!(generate_grid("17:00", "09:00", 30).is_empty());
        assert!(generate_grid("09:00", "09:00", 30).is_empty());
        assert!(generate_grid("09:00", "17:00", 0).is_empty());
        assert!(generate_grid("nine", "17:00", 30).is_empty());
    }

    #[test]
    fn huge_steps_and_bounds_do_not_overflow() {
        assert!(generate_grid("09:00", "17:00", u32::MAX).is_empty());
        assert!(generate_grid("00:01", "00:00", u32::MAX).is_empty());
        assert!(generate_grid("99999999:00", "17:00", 30).is_empty());
    }

    #[test]
    fn period_boundaries() {
        assert_eq!(Period::of("11:59"), Period::Morning);
        assert_eq!(Period::of("12:00"), Period::Afternoon);
        assert_eq!(Period::of("16:30"), Period::Afternoon);
        assert_eq!(Period::of("17:00"), Period::Evening);
    }

    #[test]
    fn lunch_is_blacked_out() {
        let cfg = ScheduleConfig::default();
        assert_eq!(cfg.blackout_reason("12:30"), Some("Lunch"));
        assert_eq!(cfg.blackout_reason("13:00"), Some("Lunch"));
        assert_eq!(cfg.blackout_reason("12:00"), None);
    }
}
