use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

use crate::mode::{Mode, ModeState};
use crate::settings::model::minutes_since_midnight;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Threshold {
    StopwatchAlarm,
    TimerWarning,
    TimerExpired,
    WallClockAlarm,
}

/// How strictly the wall-clock alarm matches. Tick evaluation wants the exact
/// zero second; the minute poll only sees the minute.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AlarmMatch {
    Second,
    Minute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub stopwatch_alarm_enabled: bool,
    pub stopwatch_alarm_seconds: u64,
    pub timer_warning_seconds: u64,
    pub alarm_enabled: bool,
    pub alarm_time: Option<NaiveTime>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            stopwatch_alarm_enabled: false,
            stopwatch_alarm_seconds: 300,
            timer_warning_seconds: 10,
            alarm_enabled: false,
            alarm_time: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub crossed: Vec<Threshold>,
}

impl TickOutcome {
    pub fn contains(&self, threshold: Threshold) -> bool {
        self.crossed.contains(&threshold)
    }

    pub fn is_empty(&self) -> bool {
        self.crossed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ThresholdEvaluator {
    last_alarm_minute: Option<(NaiveDate, u16)>,
}

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the predicates in their fixed order. Expiry teardown (the timer
    /// stops) is applied after every predicate has seen the tick.
    pub fn evaluate<Tz: TimeZone>(
        &mut self,
        state: &mut ModeState,
        config: &ThresholdConfig,
        wall: &DateTime<Tz>,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        // Only the visible stopwatch can trip its alarm.
        if config.stopwatch_alarm_enabled
            && state.active == Mode::Stopwatch
            && !state.flags.stopwatch_alarm_triggered
            && state.elapsed_seconds >= config.stopwatch_alarm_seconds
        {
            state.flags.stopwatch_alarm_triggered = true;
            outcome.crossed.push(Threshold::StopwatchAlarm);
        }

        if state.timer_running
            && !state.flags.timer_warning_triggered
            && state.remaining_seconds > 0
            && state.remaining_seconds <= config.timer_warning_seconds
        {
            state.flags.timer_warning_triggered = true;
            outcome.crossed.push(Threshold::TimerWarning);
        }

        let expired = state.timer_running && state.remaining_seconds == 0;
        if expired {
            outcome.crossed.push(Threshold::TimerExpired);
        }

        if self.wall_alarm_due(config, wall, AlarmMatch::Second) {
            outcome.crossed.push(Threshold::WallClockAlarm);
        }

        if expired {
            state.timer_running = false;
        }
        outcome
    }

    /// Fires at most once per calendar minute, whichever caller sees it first.
    pub fn wall_alarm_due<Tz: TimeZone>(
        &mut self,
        config: &ThresholdConfig,
        wall: &DateTime<Tz>,
        matching: AlarmMatch,
    ) -> bool {
        if !config.alarm_enabled {
            return false;
        }
        let Some(alarm_time) = config.alarm_time else {
            return false;
        };
        if wall.hour() != alarm_time.hour() || wall.minute() != alarm_time.minute() {
            return false;
        }
        if matching == AlarmMatch::Second && wall.second() != 0 {
            return false;
        }
        let slot = (wall.date_naive(), minutes_since_midnight(wall.time()));
        if self.last_alarm_minute == Some(slot) {
            return false;
        }
        self.last_alarm_minute = Some(slot);
        true
    }

    pub fn last_alarm_minute(&self) -> Option<(NaiveDate, u16)> {
        self.last_alarm_minute
    }
}

fn resolve_local_datetime<Tz>(timezone: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
{
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(first, _second) => Some(first),
        LocalResult::None => None,
    }
}

/// Next instant strictly after `now` at which the wall clock reads
/// `alarm_time`. Skipped local times (spring forward) move to the next day.
pub fn next_alarm_occurrence_in_tz<Tz>(
    alarm_time: NaiveTime,
    now: &DateTime<Tz>,
    timezone: &Tz,
) -> Option<DateTime<Tz>>
where
    Tz: TimeZone,
{
    for day_offset in 0_u64..3 {
        let date = now.date_naive().checked_add_days(Days::new(day_offset))?;
        let Some(candidate) = resolve_local_datetime(timezone, date.and_time(alarm_time)) else {
            continue;
        };
        if candidate > *now {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone};
    use chrono_tz::America::New_York;
    use chrono_tz::Europe::Berlin;

    use super::*;

    fn seven() -> NaiveTime {
        NaiveTime::from_hms_opt(7, 0, 0).expect("valid time")
    }

    fn alarm_config() -> ThresholdConfig {
        ThresholdConfig {
            alarm_enabled: true,
            alarm_time: Some(seven()),
            ..ThresholdConfig::default()
        }
    }

    #[test]
    fn wall_alarm_fires_once_at_zero_second() {
        let mut evaluator = ThresholdEvaluator::new();
        let mut state = ModeState::default();
        let config = alarm_config();
        let start = Berlin
            .with_ymd_and_hms(2026, 3, 9, 6, 59, 58)
            .single()
            .expect("valid");

        let mut fired = Vec::new();
        for offset in 0..10 {
            let wall = start + Duration::seconds(offset);
            if evaluator
                .evaluate(&mut state, &config, &wall)
                .contains(Threshold::WallClockAlarm)
            {
                fired.push(wall.second());
            }
        }
        assert_eq!(fired, vec![0]);
    }

    #[test]
    fn wall_alarm_does_not_fire_mid_minute() {
        let mut evaluator = ThresholdEvaluator::new();
        let mut state = ModeState::default();
        let wall = Berlin
            .with_ymd_and_hms(2026, 3, 9, 7, 0, 5)
            .single()
            .expect("valid");
        let outcome = evaluator.evaluate(&mut state, &alarm_config(), &wall);
        assert!(outcome.is_empty());
    }

    #[test]
    fn minute_poll_and_tick_share_the_guard() {
        let mut evaluator = ThresholdEvaluator::new();
        let config = alarm_config();
        let polled = Berlin
            .with_ymd_and_hms(2026, 3, 9, 7, 0, 0)
            .single()
            .expect("valid");
        assert!(evaluator.wall_alarm_due(&config, &polled, AlarmMatch::Minute));
        assert!(!evaluator.wall_alarm_due(&config, &polled, AlarmMatch::Second));

        let next_day = polled + Duration::days(1);
        assert!(evaluator.wall_alarm_due(&config, &next_day, AlarmMatch::Second));
        assert_eq!(
            evaluator.last_alarm_minute(),
            Some((NaiveDate::from_ymd_opt(2026, 3, 10).expect("date"), 420))
        );
    }

    #[test]
    fn disabled_alarm_never_fires() {
        let mut evaluator = ThresholdEvaluator::new();
        let config = ThresholdConfig {
            alarm_enabled: false,
            ..alarm_config()
        };
        let wall = Berlin
            .with_ymd_and_hms(2026, 3, 9, 7, 0, 0)
            .single()
            .expect("valid");
        assert!(!evaluator.wall_alarm_due(&config, &wall, AlarmMatch::Minute));
    }

    #[test]
    fn stopwatch_alarm_is_single_shot_until_reset() {
        let mut evaluator = ThresholdEvaluator::new();
        let config = ThresholdConfig {
            stopwatch_alarm_enabled: true,
            stopwatch_alarm_seconds: 3,
            ..ThresholdConfig::default()
        };
        let wall = Berlin
            .with_ymd_and_hms(2026, 3, 9, 12, 0, 0)
            .single()
            .expect("valid");
        let mut state = ModeState {
            active: Mode::Stopwatch,
            stopwatch_running: true,
            ..ModeState::default()
        };

        let mut hits = 0;
        for elapsed in 1..=6 {
            state.elapsed_seconds = elapsed;
            if evaluator
                .evaluate(&mut state, &config, &wall)
                .contains(Threshold::StopwatchAlarm)
            {
                hits += 1;
            }
        }
        assert_eq!(hits, 1);
        assert!(state.flags.stopwatch_alarm_triggered);

        state.flags.stopwatch_alarm_triggered = false;
        state.elapsed_seconds = 3;
        assert!(evaluator
            .evaluate(&mut state, &config, &wall)
            .contains(Threshold::StopwatchAlarm));
    }

    #[test]
    fn paused_stopwatch_outside_its_mode_stays_quiet() {
        let mut evaluator = ThresholdEvaluator::new();
        let config = ThresholdConfig {
            stopwatch_alarm_enabled: true,
            stopwatch_alarm_seconds: 5,
            ..ThresholdConfig::default()
        };
        let wall = Berlin
            .with_ymd_and_hms(2026, 3, 9, 12, 0, 0)
            .single()
            .expect("valid");
        let mut state = ModeState {
            active: Mode::Clock,
            elapsed_seconds: 10,
            ..ModeState::default()
        };
        assert!(evaluator.evaluate(&mut state, &config, &wall).is_empty());
        assert!(!state.flags.stopwatch_alarm_triggered);

        state.active = Mode::Stopwatch;
        assert!(evaluator
            .evaluate(&mut state, &config, &wall)
            .contains(Threshold::StopwatchAlarm));
    }

    #[test]
    fn timer_warning_then_single_expiry() {
        let mut evaluator = ThresholdEvaluator::new();
        let config = ThresholdConfig {
            timer_warning_seconds: 2,
            ..ThresholdConfig::default()
        };
        let wall = Berlin
            .with_ymd_and_hms(2026, 3, 9, 12, 0, 0)
            .single()
            .expect("valid");
        let mut state = ModeState {
            timer_running: true,
            remaining_seconds: 4,
            ..ModeState::default()
        };

        let mut seen = Vec::new();
        for _ in 0..6 {
            state.remaining_seconds = state.remaining_seconds.saturating_sub(1);
            seen.extend(evaluator.evaluate(&mut state, &config, &wall).crossed);
        }
        assert_eq!(seen, vec![Threshold::TimerWarning, Threshold::TimerExpired]);
        assert!(!state.timer_running);
        assert_eq!(state.remaining_seconds, 0);
    }

    #[test]
    fn warning_skipped_when_already_below_at_zero() {
        let mut evaluator = ThresholdEvaluator::new();
        let wall = Berlin
            .with_ymd_and_hms(2026, 3, 9, 12, 0, 0)
            .single()
            .expect("valid");
        let mut state = ModeState {
            timer_running: true,
            remaining_seconds: 0,
            ..ModeState::default()
        };
        let outcome = evaluator.evaluate(&mut state, &ThresholdConfig::default(), &wall);
        assert_eq!(outcome.crossed, vec![Threshold::TimerExpired]);
    }

    #[test]
    fn predicates_report_in_fixed_order() {
        let mut evaluator = ThresholdEvaluator::new();
        let config = ThresholdConfig {
            stopwatch_alarm_enabled: true,
            stopwatch_alarm_seconds: 1,
            ..alarm_config()
        };
        let wall = Berlin
            .with_ymd_and_hms(2026, 3, 9, 7, 0, 0)
            .single()
            .expect("valid");
        let mut state = ModeState {
            active: Mode::Stopwatch,
            stopwatch_running: true,
            elapsed_seconds: 1,
            timer_running: true,
            remaining_seconds: 0,
            ..ModeState::default()
        };
        let outcome = evaluator.evaluate(&mut state, &config, &wall);
        assert_eq!(
            outcome.crossed,
            vec![
                Threshold::StopwatchAlarm,
                Threshold::TimerExpired,
                Threshold::WallClockAlarm,
            ]
        );
    }

    #[test]
    fn next_occurrence_rolls_to_tomorrow() {
        let now = New_York
            .with_ymd_and_hms(2026, 6, 1, 7, 0, 0)
            .single()
            .expect("valid");
        let next = next_alarm_occurrence_in_tz(seven(), &now, &New_York).expect("next");
        assert_eq!(
            next.date_naive(),
            NaiveDate::from_ymd_opt(2026, 6, 2).expect("date")
        );
    }

    #[test]
    fn dst_spring_forward_nonexistent_time_is_skipped() {
        let now = New_York
            .with_ymd_and_hms(2026, 3, 8, 0, 30, 0)
            .single()
            .expect("valid");
        let half_past_two = NaiveTime::from_hms_opt(2, 30, 0).expect("valid");
        let next = next_alarm_occurrence_in_tz(half_past_two, &now, &New_York).expect("next");
        assert_eq!(
            next.date_naive(),
            NaiveDate::from_ymd_opt(2026, 3, 9).expect("date")
        );
    }

    #[test]
    fn dst_fall_back_chooses_first_ambiguous_instance() {
        let now = New_York
            .with_ymd_and_hms(2026, 11, 1, 0, 0, 0)
            .single()
            .expect("valid");
        let half_past_one = NaiveTime::from_hms_opt(1, 30, 0).expect("valid");
        let expected = match New_York.from_local_datetime(
            &NaiveDate::from_ymd_opt(2026, 11, 1)
                .expect("date")
                .and_time(half_past_one),
        ) {
            LocalResult::Ambiguous(first, _second) => first,
            _ => panic!("expected ambiguous local time"),
        };
        let actual = next_alarm_occurrence_in_tz(half_past_one, &now, &New_York).expect("next");
        assert_eq!(actual, expected);
    }
}
