use anyhow::Result;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{WatchError, WatchResult};

pub const SETTINGS_KEY: &str = "cockpitWatchSettings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    #[serde(default = "default_alarm_time")]
    pub alarm_time: String,
    #[serde(default = "default_beep")]
    pub alarm_sound: String,
    #[serde(default)]
    pub alarm_enabled: bool,
    #[serde(default = "default_timer_minutes")]
    pub timer_minutes: u32,
    #[serde(default)]
    pub timer_seconds: u32,
    #[serde(default = "default_timer_warning_time")]
    pub timer_warning_time: u32,
    #[serde(default = "default_warning")]
    pub timer_warning_sound: String,
    #[serde(default = "default_stopwatch_alarm_time")]
    pub stopwatch_alarm_time: String,
    #[serde(default = "default_beep")]
    pub stopwatch_alarm_sound: String,
    #[serde(default)]
    pub stopwatch_alarm_enabled: bool,
    #[serde(rename = "format24h", default = "default_true")]
    pub format_24h: bool,
    #[serde(default = "default_true")]
    pub show_seconds: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_audio_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_audio_name: Option<String>,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            alarm_time: default_alarm_time(),
            alarm_sound: default_beep(),
            alarm_enabled: false,
            timer_minutes: default_timer_minutes(),
            timer_seconds: 0,
            timer_warning_time: default_timer_warning_time(),
            timer_warning_sound: default_warning(),
            stopwatch_alarm_time: default_stopwatch_alarm_time(),
            stopwatch_alarm_sound: default_beep(),
            stopwatch_alarm_enabled: false,
            format_24h: true,
            show_seconds: true,
            custom_audio_data: None,
            custom_audio_name: None,
        }
    }
}

impl PersistedSettings {
    pub fn alarm_time_of_day(&self) -> Option<NaiveTime> {
        parse_alarm_time(&self.alarm_time).ok()
    }

    pub fn stopwatch_alarm_seconds(&self) -> u64 {
        parse_stopwatch_alarm_time(&self.stopwatch_alarm_time)
            .unwrap_or(DEFAULT_STOPWATCH_ALARM_SECONDS)
    }

    pub fn timer_duration_seconds(&self) -> u64 {
        u64::from(self.timer_minutes) * 60 + u64::from(self.timer_seconds)
    }

    pub fn has_custom_audio(&self) -> bool {
        self.custom_audio_data.is_some() && self.custom_audio_name.is_some()
    }
}

const DEFAULT_STOPWATCH_ALARM_SECONDS: u64 = 300;

pub fn parse_settings_text(content: &str) -> Result<PersistedSettings> {
    serde_json::from_str::<PersistedSettings>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid settings JSON at line {line}, column {column}: {err}")
    })
}

pub fn settings_to_text(settings: &PersistedSettings) -> Result<String> {
    Ok(serde_json::to_string_pretty(settings)?)
}

pub fn parse_alarm_time(input: &str) -> WatchResult<NaiveTime> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map(|time| time.with_second(0).unwrap_or(time))
        .map_err(|_| WatchError::invalid_setting("alarmTime", format!("'{input}' is not HH:MM")))
}

pub fn parse_stopwatch_alarm_time(input: &str) -> WatchResult<u64> {
    let parts = input
        .trim()
        .split(':')
        .map(|part| part.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| {
            WatchError::invalid_setting("stopwatchAlarmTime", format!("'{input}' is not HH:MM:SS"))
        })?;
    match parts.as_slice() {
        [hours, minutes] if *minutes < 60 => Ok(hours * 3600 + minutes * 60),
        [hours, minutes, seconds] if *minutes < 60 && *seconds < 60 => {
            Ok(hours * 3600 + minutes * 60 + seconds)
        }
        _ => Err(WatchError::invalid_setting(
            "stopwatchAlarmTime",
            format!("'{input}' is not HH:MM:SS"),
        )),
    }
}

pub fn minutes_since_midnight(time: NaiveTime) -> u16 {
    (time.hour() * 60 + time.minute()) as u16
}

fn default_alarm_time() -> String {
    "07:00".to_string()
}

fn default_beep() -> String {
    "beep".to_string()
}

fn default_warning() -> String {
    "warning".to_string()
}

fn default_timer_minutes() -> u32 {
    5
}

fn default_timer_warning_time() -> u32 {
    10
}

fn default_stopwatch_alarm_time() -> String {
    "00:05:00".to_string()
}

fn default_true() -> bool {
    true
}
