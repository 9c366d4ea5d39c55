use chrono::NaiveTime;
use tracing::debug;

use crate::tick::{Millis, TickKind, TickScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Clock,
    Stopwatch,
    Timer,
    Alarm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdFlags {
    pub stopwatch_alarm_triggered: bool,
    pub timer_warning_triggered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeState {
    pub active: Mode,
    pub stopwatch_running: bool,
    pub timer_running: bool,
    pub elapsed_seconds: u64,
    pub remaining_seconds: u64,
    pub alarm_time: Option<NaiveTime>,
    pub alarm_enabled: bool,
    pub flags: ThresholdFlags,
}

impl Default for ModeState {
    fn default() -> Self {
        Self {
            active: Mode::Clock,
            stopwatch_running: false,
            timer_running: false,
            elapsed_seconds: 0,
            remaining_seconds: 0,
            alarm_time: None,
            alarm_enabled: false,
            flags: ThresholdFlags::default(),
        }
    }
}

impl ModeState {
    pub fn running(&self) -> bool {
        match self.active {
            Mode::Stopwatch => self.stopwatch_running,
            Mode::Timer => self.timer_running,
            Mode::Clock | Mode::Alarm => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLayout {
    pub start_stop: Option<&'static str>,
    pub start_stop_active: bool,
    pub reset: bool,
    pub set: Option<&'static str>,
}

/// Owns the counters and which interval each running counter is subscribed to.
#[derive(Debug, Default)]
pub struct ModeMachine {
    state: ModeState,
    timer_minutes: u64,
    timer_seconds: u64,
}

impl ModeMachine {
    pub fn new(state: ModeState) -> Self {
        Self {
            state,
            timer_minutes: 0,
            timer_seconds: 0,
        }
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ModeState {
        &mut self.state
    }

    pub fn active(&self) -> Mode {
        self.state.active
    }

    pub fn switch_mode(&mut self, target: Mode, ticks: &mut TickScheduler) {
        ticks.stop(TickKind::Stopwatch);
        ticks.stop(TickKind::Timer);
        self.state.stopwatch_running = false;
        self.state.timer_running = false;
        debug!(from = ?self.state.active, to = ?target, "switching mode");
        self.state.active = target;
    }

    pub fn start_stopwatch(&mut self, ticks: &mut TickScheduler, now: Millis) {
        if self.state.stopwatch_running {
            return;
        }
        self.state.stopwatch_running = true;
        ticks.start(TickKind::Stopwatch, now);
    }

    pub fn stop_stopwatch(&mut self, ticks: &mut TickScheduler) {
        self.state.stopwatch_running = false;
        ticks.stop(TickKind::Stopwatch);
    }

    pub fn reset_stopwatch(&mut self, ticks: &mut TickScheduler) {
        self.stop_stopwatch(ticks);
        self.state.elapsed_seconds = 0;
        self.state.flags.stopwatch_alarm_triggered = false;
    }

    /// Returns false when there is nothing left to count down.
    pub fn start_timer(&mut self, ticks: &mut TickScheduler, now: Millis) -> bool {
        if self.state.remaining_seconds == 0 {
            return false;
        }
        if self.state.timer_running {
            return true;
        }
        self.state.timer_running = true;
        self.state.flags.timer_warning_triggered = false;
        ticks.start(TickKind::Timer, now);
        true
    }

    pub fn stop_timer(&mut self, ticks: &mut TickScheduler) {
        self.state.timer_running = false;
        ticks.stop(TickKind::Timer);
    }

    pub fn reset_timer(&mut self, ticks: &mut TickScheduler) {
        self.stop_timer(ticks);
        self.state.flags.timer_warning_triggered = false;
        self.reload_timer();
    }

    pub fn configure_timer(&mut self, minutes: u64, seconds: u64) {
        self.timer_minutes = minutes;
        self.timer_seconds = seconds;
    }

    pub fn set_timer(&mut self, minutes: u64, seconds: u64) {
        self.configure_timer(minutes, seconds);
        self.reload_timer();
    }

    pub fn reload_timer(&mut self) {
        self.state.remaining_seconds = self.timer_minutes * 60 + self.timer_seconds;
    }

    /// Toggles the counter of the active mode; clock and alarm ignore it.
    pub fn toggle_running(&mut self, ticks: &mut TickScheduler, now: Millis) {
        match self.state.active {
            Mode::Stopwatch => {
                if self.state.stopwatch_running {
                    self.stop_stopwatch(ticks);
                } else {
                    self.start_stopwatch(ticks, now);
                }
            }
            Mode::Timer => {
                if self.state.timer_running {
                    self.stop_timer(ticks);
                } else if !self.start_timer(ticks, now) {
                    debug!("timer start ignored, nothing to count down");
                }
            }
            Mode::Clock | Mode::Alarm => {}
        }
    }

    pub fn reset_active(&mut self, ticks: &mut TickScheduler) {
        match self.state.active {
            Mode::Stopwatch => self.reset_stopwatch(ticks),
            Mode::Timer => self.reset_timer(ticks),
            Mode::Clock | Mode::Alarm => {}
        }
    }

    pub fn advance_stopwatch(&mut self) {
        if self.state.stopwatch_running {
            self.state.elapsed_seconds = self.state.elapsed_seconds.saturating_add(1);
        }
    }

    pub fn advance_timer(&mut self) {
        if self.state.timer_running {
            self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        }
    }

    pub fn button_layout(&self) -> ButtonLayout {
        let start_stop_label = |running: bool| if running { "STOP" } else { "START" };
        match self.state.active {
            Mode::Stopwatch => ButtonLayout {
                start_stop: Some(start_stop_label(self.state.stopwatch_running)),
                start_stop_active: self.state.stopwatch_running,
                reset: true,
                set: None,
            },
            Mode::Timer => ButtonLayout {
                start_stop: Some(start_stop_label(self.state.timer_running)),
                start_stop_active: self.state.timer_running,
                reset: true,
                set: Some("SET"),
            },
            Mode::Alarm => ButtonLayout {
                start_stop: None,
                start_stop_active: false,
                reset: false,
                set: Some("CONFIG"),
            },
            Mode::Clock => ButtonLayout {
                start_stop: None,
                start_stop_active: false,
                reset: false,
                set: None,
            },
        }
    }
}
