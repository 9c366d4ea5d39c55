use chrono::{DateTime, Duration, FixedOffset};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::alarm::{AlarmMatch, Threshold, ThresholdConfig, ThresholdEvaluator, TickOutcome};
use crate::alert::catalog::{AlertKind, DEFAULT_PROFILE, is_known_profile};
use crate::alert::custom::accept_upload;
use crate::alert::engine::{AlertEngine, EngineEvent, PlayPath};
use crate::alert::AudioBackend;
use crate::bridge::{BridgeClient, BridgeRequest, MAIN_ALARM_ID, NotificationAction};
use crate::error::{WatchError, WatchResult};
use crate::format::{DisplayOptions, format_alarm, format_clock, format_date, format_duration};
use crate::instruments::Instruments;
use crate::mode::{Mode, ModeMachine, ModeState};
use crate::settings::model::{minutes_since_midnight, parse_alarm_time, parse_stopwatch_alarm_time};
use crate::settings::{KeyValueStore, PersistedSettings, load_settings, save_settings};
use crate::surface::{Led, RenderSurface};
use crate::tick::{Millis, TickKind, TickScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Mode(Mode),
    StartStop,
    Reset,
    Set,
    Config,
}

enum Due {
    Tick(TickKind, Millis),
    Alert,
}

/// The whole application state. All mutation happens in `pump` and the
/// user-event methods, each of which runs to completion.
pub struct Watch<R: RenderSurface, A: AudioBackend> {
    settings: PersistedSettings,
    store: Box<dyn KeyValueStore>,
    surface: R,
    audio: A,
    bridge: BridgeClient,
    machine: ModeMachine,
    ticks: TickScheduler,
    thresholds: ThresholdEvaluator,
    alerts: AlertEngine,
    instruments: Instruments,
    rng: StdRng,
    display: DisplayOptions,
    wall: DateTime<FixedOffset>,
}

impl<R: RenderSurface, A: AudioBackend> Watch<R, A> {
    /// Loads settings, starts the always-on intervals and re-sends the saved
    /// alarm to the background worker.
    pub fn start(
        store: Box<dyn KeyValueStore>,
        surface: R,
        audio: A,
        bridge: BridgeClient,
        now_ms: Millis,
        wall: DateTime<FixedOffset>,
    ) -> Self {
        let settings = load_settings(store.as_ref());
        let mut machine = ModeMachine::new(ModeState {
            alarm_time: settings.alarm_time_of_day(),
            alarm_enabled: settings.alarm_enabled,
            ..ModeState::default()
        });
        machine.set_timer(
            u64::from(settings.timer_minutes),
            u64::from(settings.timer_seconds),
        );

        let mut ticks = TickScheduler::new();
        ticks.start(TickKind::Clock, now_ms);
        ticks.start(TickKind::Instruments, now_ms);
        ticks.start(TickKind::AlarmPoll, now_ms);

        let mut watch = Self {
            display: DisplayOptions::new(settings.format_24h, settings.show_seconds),
            settings,
            store,
            surface,
            audio,
            bridge,
            machine,
            ticks,
            thresholds: ThresholdEvaluator::new(),
            alerts: AlertEngine::new(),
            instruments: Instruments::default(),
            rng: StdRng::from_entropy(),
            wall,
        };
        watch.surface.set_led(Led::Battery, true);
        watch.surface.set_led(Led::Alarm, watch.settings.alarm_enabled);
        watch.surface.show_instruments(&watch.instruments.readout());
        watch.revive_background_alarm();
        watch.render();
        watch.surface.present();
        info!(
            alarm = %watch.settings.alarm_time,
            alarm_enabled = watch.settings.alarm_enabled,
            background = watch.bridge.is_available(),
            "watch started"
        );
        watch
    }

    pub fn settings(&self) -> &PersistedSettings {
        &self.settings
    }

    pub fn state(&self) -> &ModeState {
        self.machine.state()
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    pub fn bridge(&self) -> &BridgeClient {
        &self.bridge
    }

    pub fn next_due(&self) -> Option<Millis> {
        match (self.ticks.next_due(), self.alerts.next_due()) {
            (Some(tick), Some(alert)) => Some(tick.min(alert)),
            (tick, alert) => tick.or(alert),
        }
    }

    /// Dispatches everything due up to `now_ms` in due order. Each task sees
    /// the wall clock as it was when the task fell due.
    pub fn pump(&mut self, now_ms: Millis, wall: DateTime<FixedOffset>) {
        while let Some(due) = self.next_task(now_ms) {
            match due {
                Due::Tick(kind, due_ms) => {
                    let late = now_ms.saturating_sub(due_ms);
                    self.wall = wall - Duration::milliseconds(late as i64);
                    self.on_tick(kind, due_ms);
                }
                Due::Alert => {
                    if let Some(EngineEvent::AutoStopped(kind)) =
                        self.alerts.dispatch_due(&mut self.audio, now_ms)
                    {
                        debug!(kind = kind.label(), "alert window elapsed");
                        self.surface.set_led(Led::Alerting, false);
                    }
                }
            }
        }
        self.wall = wall;
        for (kind, reply) in self.bridge.poll_replies() {
            debug!(kind, ?reply, "bridge reply");
        }
        self.surface.present();
    }

    fn next_task(&mut self, now_ms: Millis) -> Option<Due> {
        let tick = self.ticks.next_due().filter(|due| *due <= now_ms);
        let alert = self.alerts.next_due().filter(|due| *due <= now_ms);
        match (tick, alert) {
            (Some(tick), Some(alert)) if alert < tick => Some(Due::Alert),
            (Some(_), _) => {
                let task = self.ticks.pop_due(now_ms)?;
                Some(Due::Tick(task.event, task.due))
            }
            (None, Some(_)) => Some(Due::Alert),
            (None, None) => None,
        }
    }

    fn on_tick(&mut self, kind: TickKind, due_ms: Millis) {
        match kind {
            TickKind::Clock => {
                self.render();
                self.evaluate(due_ms);
            }
            TickKind::Stopwatch => {
                self.machine.advance_stopwatch();
                self.render();
                self.evaluate(due_ms);
            }
            TickKind::Timer => {
                self.machine.advance_timer();
                self.render();
                self.evaluate(due_ms);
            }
            TickKind::Instruments => {
                self.instruments.step(&mut self.rng);
                self.surface.show_instruments(&self.instruments.readout());
            }
            TickKind::AlarmPoll => self.poll_alarm(due_ms),
        }
    }

    fn evaluate(&mut self, now_ms: Millis) {
        let config = self.threshold_config();
        let outcome = self
            .thresholds
            .evaluate(self.machine.state_mut(), &config, &self.wall);
        if !outcome.is_empty() {
            self.handle_crossings(outcome, now_ms);
        }
    }

    fn handle_crossings(&mut self, outcome: TickOutcome, now_ms: Millis) {
        for threshold in outcome.crossed {
            match threshold {
                Threshold::StopwatchAlarm => {
                    info!(elapsed = self.state().elapsed_seconds, "stopwatch alarm reached");
                    let profile = self.settings.stopwatch_alarm_sound.clone();
                    self.raise(AlertKind::StopwatchThreshold, &profile, now_ms);
                    self.surface.flash();
                }
                Threshold::TimerWarning => {
                    info!(remaining = self.state().remaining_seconds, "timer warning");
                    let profile = self.settings.timer_warning_sound.clone();
                    self.raise(AlertKind::TimerWarning, &profile, now_ms);
                }
                Threshold::TimerExpired => {
                    info!("timer expired");
                    self.machine.stop_timer(&mut self.ticks);
                    self.raise(AlertKind::TimerExpiry, DEFAULT_PROFILE, now_ms);
                    self.surface.flash();
                    self.render();
                }
                Threshold::WallClockAlarm => self.fire_wall_alarm(now_ms),
            }
        }
    }

    fn fire_wall_alarm(&mut self, now_ms: Millis) {
        info!(alarm = %self.settings.alarm_time, "alarm time reached");
        let profile = self.settings.alarm_sound.clone();
        self.raise(AlertKind::Alarm, &profile, now_ms);
        self.surface.flash();
    }

    fn raise(&mut self, kind: AlertKind, profile: &str, now_ms: Millis) {
        let path = self.alerts.play_alert(
            &mut self.audio,
            kind,
            profile,
            self.settings.custom_audio_data.as_deref(),
            now_ms,
        );
        if path == PlayPath::Blocking {
            self.surface.show_message(&format!("{} (audio unavailable)", kind.label()));
        }
        self.surface.set_led(Led::Alerting, true);
    }

    /// With a worker the check is delegated; otherwise the alarm minute is
    /// matched here, guarded against anything that already fired it.
    fn poll_alarm(&mut self, now_ms: Millis) {
        if self.bridge.is_available() {
            match self.bridge.check_alarms() {
                Ok(()) => return,
                Err(err) => debug!(error = %err, "alarm check falls back to in-process"),
            }
        }
        if self.alerts.is_active() {
            return;
        }
        let config = self.threshold_config();
        if self
            .thresholds
            .wall_alarm_due(&config, &self.wall, AlarmMatch::Minute)
        {
            self.fire_wall_alarm(now_ms);
        }
    }

    fn threshold_config(&self) -> ThresholdConfig {
        ThresholdConfig {
            stopwatch_alarm_enabled: self.settings.stopwatch_alarm_enabled,
            stopwatch_alarm_seconds: self.settings.stopwatch_alarm_seconds(),
            timer_warning_seconds: u64::from(self.settings.timer_warning_time),
            alarm_enabled: self.machine.state().alarm_enabled,
            alarm_time: self.machine.state().alarm_time,
        }
    }

    fn render(&mut self) {
        let state = self.machine.state();
        let text = match state.active {
            Mode::Clock => format_clock(&self.wall, self.display),
            Mode::Stopwatch => format_duration(state.elapsed_seconds),
            Mode::Timer => format_duration(state.remaining_seconds),
            Mode::Alarm => format_alarm(state.alarm_time),
        };
        let timer_running = state.timer_running;
        let active = state.active;
        self.surface.show_time(&text);
        self.surface.show_date(&format_date(&self.wall));
        self.surface.show_mode(active);
        self.surface.show_buttons(self.machine.button_layout());
        self.surface.set_led(Led::Timer, timer_running);
    }

    /// Stops a sounding alert instead of acting. Returns true when the event
    /// was consumed that way.
    fn silence_alert(&mut self) -> bool {
        if !self.alerts.stop_alert(&mut self.audio) {
            return false;
        }
        self.surface.set_led(Led::Alerting, false);
        self.surface.present();
        true
    }

    pub fn press(&mut self, button: Button, now_ms: Millis) {
        if self.silence_alert() {
            debug!(?button, "button silenced the alert");
            return;
        }
        match button {
            Button::Mode(mode) => self.machine.switch_mode(mode, &mut self.ticks),
            Button::StartStop => self.machine.toggle_running(&mut self.ticks, now_ms),
            Button::Reset => self.machine.reset_active(&mut self.ticks),
            Button::Set => match self.machine.active() {
                Mode::Timer => self.machine.reload_timer(),
                Mode::Alarm => self.surface.toggle_config(),
                Mode::Clock | Mode::Stopwatch => {}
            },
            Button::Config => self.surface.toggle_config(),
        }
        self.render();
        self.surface.present();
    }

    pub fn escape(&mut self) {
        if self.silence_alert() {
            debug!("escape silenced the alert");
        }
    }

    /// Answers the alarm the way its notification buttons do. Snoozing needs
    /// the worker; dismissing still silences without one.
    pub fn answer_alarm(&mut self, action: NotificationAction) -> WatchResult<()> {
        if self.silence_alert() {
            debug!(?action, "alarm answered");
        }
        let click = BridgeRequest::NotificationClick {
            alarm_id: MAIN_ALARM_ID.to_string(),
            action,
        };
        match self.bridge.post(click) {
            Err(err) if action == NotificationAction::Dismiss => {
                debug!(error = %err, "dismiss stays in-process");
                Ok(())
            }
            result => result,
        }
    }

    pub fn set_alarm_time(&mut self, input: &str) -> WatchResult<()> {
        let time = parse_alarm_time(input)?;
        self.settings.alarm_time = format_alarm(Some(time));
        self.machine.state_mut().alarm_time = Some(time);
        self.persist();
        self.sync_background_alarm();
        self.refresh();
        Ok(())
    }

    pub fn set_alarm_enabled(&mut self, enabled: bool) {
        self.settings.alarm_enabled = enabled;
        self.machine.state_mut().alarm_enabled = enabled;
        self.surface.set_led(Led::Alarm, enabled);
        self.persist();
        self.sync_background_alarm();
        self.refresh();
    }

    pub fn set_alarm_sound(&mut self, profile: &str) -> WatchResult<()> {
        self.settings.alarm_sound = known_profile("alarmSound", profile)?;
        self.persist();
        self.sync_background_alarm();
        Ok(())
    }

    /// Takes effect on the next SET or reset, as the display keeps counting
    /// whatever is loaded.
    pub fn set_timer_duration(&mut self, minutes: u32, seconds: u32) -> WatchResult<()> {
        if seconds > 59 {
            return Err(WatchError::invalid_setting(
                "timerSeconds",
                format!("{seconds} is not between 0 and 59"),
            ));
        }
        self.settings.timer_minutes = minutes;
        self.settings.timer_seconds = seconds;
        self.machine
            .configure_timer(u64::from(minutes), u64::from(seconds));
        self.persist();
        Ok(())
    }

    pub fn set_timer_warning_time(&mut self, seconds: u32) {
        self.settings.timer_warning_time = seconds;
        self.persist();
    }

    pub fn set_timer_warning_sound(&mut self, profile: &str) -> WatchResult<()> {
        self.settings.timer_warning_sound = known_profile("timerWarningSound", profile)?;
        self.persist();
        Ok(())
    }

    pub fn set_stopwatch_alarm_time(&mut self, input: &str) -> WatchResult<()> {
        parse_stopwatch_alarm_time(input)?;
        self.settings.stopwatch_alarm_time = input.trim().to_string();
        self.persist();
        Ok(())
    }

    pub fn set_stopwatch_alarm_enabled(&mut self, enabled: bool) {
        self.settings.stopwatch_alarm_enabled = enabled;
        self.persist();
    }

    pub fn set_stopwatch_alarm_sound(&mut self, profile: &str) -> WatchResult<()> {
        self.settings.stopwatch_alarm_sound = known_profile("stopwatchAlarmSound", profile)?;
        self.persist();
        Ok(())
    }

    pub fn set_format_24h(&mut self, format_24h: bool) {
        self.settings.format_24h = format_24h;
        self.display = DisplayOptions::new(format_24h, self.settings.show_seconds);
        self.persist();
        self.refresh();
    }

    pub fn set_show_seconds(&mut self, show_seconds: bool) {
        self.settings.show_seconds = show_seconds;
        self.display = DisplayOptions::new(self.settings.format_24h, show_seconds);
        self.persist();
        self.refresh();
    }

    /// A rejected upload is reported on the surface and changes nothing.
    pub fn upload_custom_audio(&mut self, name: &str, mime: &str, bytes: &[u8]) -> WatchResult<()> {
        match accept_upload(name, mime, bytes) {
            Ok(audio) => {
                self.settings.custom_audio_name = Some(audio.name);
                self.settings.custom_audio_data = Some(audio.data_uri);
                self.persist();
                self.surface.show_message(&format!("custom audio: {name}"));
                self.surface.present();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, name, "custom audio rejected");
                self.surface.show_message(&err.to_string());
                self.surface.present();
                Err(err)
            }
        }
    }

    pub fn preview_custom_audio(&mut self, now_ms: Millis) -> WatchResult<()> {
        let Some(data_uri) = self.settings.custom_audio_data.as_deref() else {
            return Err(WatchError::PlaybackFailure("no custom audio uploaded".to_string()));
        };
        self.alerts
            .preview_custom_audio(&mut self.audio, data_uri, now_ms)
    }

    /// Sends the saved alarm to the worker so it survives without focus.
    fn revive_background_alarm(&mut self) {
        if self.settings.alarm_enabled && self.bridge.is_available() {
            self.sync_background_alarm();
        }
    }

    fn sync_background_alarm(&mut self) {
        if !self.bridge.is_available() {
            return;
        }
        let enabled = self.settings.alarm_enabled;
        let result = match self.machine.state().alarm_time {
            Some(time) if enabled => self.bridge.schedule_alarm(
                MAIN_ALARM_ID,
                minutes_since_midnight(time),
                &self.settings.alarm_sound,
                true,
            ),
            _ => self.bridge.cancel_alarm(MAIN_ALARM_ID),
        };
        if let Err(err) = result {
            debug!(error = %err, "background alarm not updated");
        }
    }

    fn persist(&mut self) {
        if let Err(err) = save_settings(self.store.as_mut(), &self.settings) {
            warn!(error = %err, "settings not saved");
        }
    }

    fn refresh(&mut self) {
        self.render();
        self.surface.present();
    }
}

fn known_profile(field: &'static str, profile: &str) -> WatchResult<String> {
    if is_known_profile(profile) {
        Ok(profile.to_string())
    } else {
        Err(WatchError::invalid_setting(
            field,
            format!("unknown sound '{profile}'"),
        ))
    }
}
