use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike};

use crate::mode::Mode;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimeDisplayMode {
    Hour24,
    Hour12,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DisplayOptions {
    pub mode: TimeDisplayMode,
    pub show_seconds: bool,
}

impl DisplayOptions {
    pub fn new(format_24h: bool, show_seconds: bool) -> Self {
        Self {
            mode: if format_24h {
                TimeDisplayMode::Hour24
            } else {
                TimeDisplayMode::Hour12
            },
            show_seconds,
        }
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::new(true, true)
    }
}

pub fn format_clock<Tz: TimeZone>(now: &DateTime<Tz>, options: DisplayOptions) -> String {
    let hour = match options.mode {
        TimeDisplayMode::Hour24 => now.hour(),
        TimeDisplayMode::Hour12 => now.hour12().1,
    };
    let mut text = format!("{hour:02}:{:02}", now.minute());
    if options.show_seconds {
        text.push_str(&format!(":{:02}", now.second()));
    }
    if options.mode == TimeDisplayMode::Hour12 {
        text.push_str(if now.hour12().0 { " PM" } else { " AM" });
    }
    text
}

/// `HH:MM:SS`; hours keep counting past 99.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn format_date<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    let day_name = match now.weekday() {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    };
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let month = MONTHS[now.month0() as usize];
    format!("{day_name}, {:02} {month} {}", now.day(), now.year())
}

pub fn format_alarm(alarm_time: Option<NaiveTime>) -> String {
    match alarm_time {
        Some(time) => format!("{:02}:{:02}", time.hour(), time.minute()),
        None => "00:00".to_string(),
    }
}

pub fn format_minutes_of_day(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Clock => "CLOCK",
        Mode::Stopwatch => "STOPWATCH",
        Mode::Timer => "TIMER",
        Mode::Alarm => "ALARM",
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("utc offset")
            .with_ymd_and_hms(2026, 3, 8, hour, minute, second)
            .single()
            .expect("valid datetime")
    }

    #[test]
    fn clock_24h_with_and_without_seconds() {
        let now = at(7, 5, 9);
        assert_eq!(format_clock(&now, DisplayOptions::new(true, true)), "07:05:09");
        assert_eq!(format_clock(&now, DisplayOptions::new(true, false)), "07:05");
    }

    #[test]
    fn clock_12h_maps_midnight_and_noon() {
        assert_eq!(
            format_clock(&at(0, 30, 0), DisplayOptions::new(false, false)),
            "12:30 AM"
        );
        assert_eq!(
            format_clock(&at(12, 1, 2), DisplayOptions::new(false, true)),
            "12:01:02 PM"
        );
        assert_eq!(
            format_clock(&at(23, 59, 59), DisplayOptions::new(false, true)),
            "11:59:59 PM"
        );
    }

    #[test]
    fn durations_render_as_hms() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(42), "00:00:42");
        assert_eq!(format_duration(3_725), "01:02:05");
        assert_eq!(format_duration(360_000), "100:00:00");
    }

    #[test]
    fn date_line_is_spelled_out() {
        assert_eq!(format_date(&at(9, 0, 0)), "Sunday, 08 Mar 2026");
    }

    #[test]
    fn alarm_display_defaults_to_midnight() {
        assert_eq!(format_alarm(None), "00:00");
        let time = NaiveTime::from_hms_opt(6, 5, 0).expect("valid time");
        assert_eq!(format_alarm(Some(time)), "06:05");
        assert_eq!(format_minutes_of_day(425), "07:05");
    }
}
