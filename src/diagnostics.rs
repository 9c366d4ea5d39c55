use std::time::Duration;

use anyhow::Result;

use crate::alarm::thresholds::next_alarm_occurrence_in_tz;
use crate::alert::catalog::CATALOG;
use crate::bridge::{BridgeClient, BridgeReply, BridgeRequest};
use crate::format::{DisplayOptions, format_alarm, format_clock, format_duration};
use crate::settings::PersistedSettings;
use crate::time_provider::HostClock;

pub fn run_diagnostics(
    clock: &dyn HostClock,
    settings: &PersistedSettings,
    bridge: &mut BridgeClient,
) -> Result<()> {
    for line in report_lines(clock, settings, &worker_status(bridge)) {
        println!("{line}");
    }
    Ok(())
}

/// The report minus any I/O, so the worker line is passed in.
pub fn report_lines(
    clock: &dyn HostClock,
    settings: &PersistedSettings,
    worker: &str,
) -> Vec<String> {
    let sample = clock.sample();
    let display = DisplayOptions::new(settings.format_24h, settings.show_seconds);
    let mut lines = vec![
        "Cockpit Watch diagnostics".to_string(),
        format!("Clock source: {}", clock.label()),
        format!("Wall clock: {}", format_clock(&sample.wall, display)),
        format!("UTC offset: {}", sample.wall.offset()),
        format!(
            "Alarm: {} ({})",
            format_alarm(settings.alarm_time_of_day()),
            if settings.alarm_enabled { "enabled" } else { "disabled" }
        ),
    ];
    if let Some(next) = settings
        .alarm_time_of_day()
        .filter(|_| settings.alarm_enabled)
        .and_then(|time| next_alarm_occurrence_in_tz(time, &sample.wall, sample.wall.offset()))
    {
        lines.push(format!("Next alarm: {}", next.format("%Y-%m-%d %H:%M %:z")));
    }
    lines.push(format!("Alarm sound: {}", settings.alarm_sound));
    lines.push(format!(
        "Timer: {} (warning at {} s)",
        format_duration(settings.timer_duration_seconds()),
        settings.timer_warning_time
    ));
    lines.push(format!(
        "Custom audio: {}",
        settings.custom_audio_name.as_deref().unwrap_or("none")
    ));
    lines.push(format!("Alert profiles: {}", CATALOG.len()));
    lines.push(format!("Background worker: {worker}"));
    lines
}

fn worker_status(bridge: &mut BridgeClient) -> String {
    let reply = bridge
        .request(BridgeRequest::GetVersion)
        .and_then(|pending| pending.wait(Duration::from_secs(1)));
    match reply {
        Ok(BridgeReply::Version { version }) => version,
        Ok(other) => format!("unexpected reply {other:?}"),
        Err(err) => format!("unavailable ({err})"),
    }
}
