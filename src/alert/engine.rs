use std::time::Duration;

use tracing::{debug, info, warn};

use crate::alert::backend::{AudioBackend, Tone, Utterance, VoiceInfo};
use crate::alert::catalog::{AlertKind, AlertSpec, CUSTOM_PROFILE, DEFAULT_PROFILE, resolve};
use crate::error::WatchResult;
use crate::tick::{Millis, TaskId, Timeline};

pub const ALERT_WINDOW_MS: Millis = 30_000;
pub const CLIP_ESTIMATE_MS: Millis = 5_000;
pub const PREVIEW_MS: Millis = 5_000;
const REPEAT_GAP_MS: Millis = 200;
const TONE_STAGGER_MS: u64 = 10;
const SPEECH_STAGGER_MS: Millis = 50;
const SPEECH_LANGUAGE: &str = "en-US";

#[derive(Debug, Clone, PartialEq)]
pub enum AlertAction {
    Chorus(&'static AlertSpec),
    Speak(Utterance),
    ReplayClip,
    AutoStop,
    EndPreview,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PlayPath {
    Clip,
    Tones { voiced: bool },
    Blocking,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EngineEvent {
    Played,
    AutoStopped(AlertKind),
    PreviewEnded,
}

#[derive(Debug, Clone)]
pub struct AlertSession {
    pub id: u64,
    pub kind: AlertKind,
    pub profile: &'static str,
    pub path: PlayPath,
    pub started_at: Millis,
    pending: Vec<TaskId>,
    clip: Option<String>,
}

impl AlertSession {
    pub fn pending(&self) -> &[TaskId] {
        &self.pending
    }
}

/// Plays at most one alert at a time. Every delayed piece of an alert lives on
/// the engine's own timeline and belongs to the active session.
#[derive(Debug, Default)]
pub struct AlertEngine {
    timeline: Timeline<AlertAction>,
    session: Option<AlertSession>,
    preview: Option<TaskId>,
    sessions_started: u64,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&AlertSession> {
        self.session.as_ref()
    }

    pub fn pending_tasks(&self) -> usize {
        self.timeline.len()
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.timeline.next_due()
    }

    pub fn play_alert(
        &mut self,
        backend: &mut dyn AudioBackend,
        kind: AlertKind,
        profile: &str,
        custom_clip: Option<&str>,
        now: Millis,
    ) -> PlayPath {
        self.stop_alert(backend);
        self.sessions_started += 1;
        let mut session = AlertSession {
            id: self.sessions_started,
            kind,
            profile: DEFAULT_PROFILE,
            path: PlayPath::Blocking,
            started_at: now,
            pending: Vec::new(),
            clip: None,
        };

        let mut spec = resolve(profile);
        let mut clip_played = false;
        if profile == CUSTOM_PROFILE {
            if let Some(data_uri) = custom_clip {
                match backend.play_clip(data_uri) {
                    Ok(duration) => {
                        let interval = duration
                            .map(|duration| duration.as_millis() as Millis)
                            .filter(|ms| *ms > 0)
                            .unwrap_or(CLIP_ESTIMATE_MS);
                        for i in 1..ALERT_WINDOW_MS / interval {
                            let id = self
                                .timeline
                                .schedule_once(now + i * interval, AlertAction::ReplayClip);
                            session.pending.push(id);
                        }
                        session.profile = CUSTOM_PROFILE;
                        session.path = PlayPath::Clip;
                        session.clip = Some(data_uri.to_string());
                        clip_played = true;
                    }
                    Err(err) => {
                        warn!(error = %err, "custom alert failed, falling back to beep");
                        spec = resolve(DEFAULT_PROFILE);
                    }
                }
            }
        }

        if !clip_played {
            session.profile = spec.name;
            session.path = match backend.play_tones(&chorus_tones(spec)) {
                Ok(()) => {
                    let interval = repeat_interval_ms(spec);
                    for k in 1..=repeat_total(spec) {
                        let id = self
                            .timeline
                            .schedule_once(now + k * interval, AlertAction::Chorus(spec));
                        session.pending.push(id);
                    }
                    let voiced = self.speak_layers(backend, spec, now, &mut session.pending);
                    PlayPath::Tones { voiced }
                }
                Err(err) => {
                    warn!(error = %err, "tone playback failed, raising blocking alert");
                    backend.blocking_alert(&format!("COCKPIT WATCH {}", kind.label().to_uppercase()));
                    PlayPath::Blocking
                }
            };
        }

        let auto_stop = self
            .timeline
            .schedule_once(now + ALERT_WINDOW_MS, AlertAction::AutoStop);
        session.pending.push(auto_stop);

        info!(
            kind = kind.label(),
            profile = session.profile,
            path = ?session.path,
            "alert started"
        );
        let path = session.path;
        self.session = Some(session);
        path
    }

    /// Returns whether a session was running.
    pub fn stop_alert(&mut self, backend: &mut dyn AudioBackend) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        let cancelled = self.timeline.cancel_all(session.pending.iter().copied());
        backend.cancel_speech();
        if session.clip.is_some() {
            backend.stop_clips();
        }
        debug!(session = session.id, cancelled, "alert stopped");
        true
    }

    pub fn preview_custom_audio(
        &mut self,
        backend: &mut dyn AudioBackend,
        data_uri: &str,
        now: Millis,
    ) -> WatchResult<()> {
        if let Some(previous) = self.preview.take() {
            self.timeline.cancel(previous);
            backend.stop_clips();
        }
        backend.play_clip(data_uri)?;
        self.preview = Some(
            self.timeline
                .schedule_once(now + PREVIEW_MS, AlertAction::EndPreview),
        );
        Ok(())
    }

    /// Runs the earliest action due at or before `now`, if any.
    pub fn dispatch_due(
        &mut self,
        backend: &mut dyn AudioBackend,
        now: Millis,
    ) -> Option<EngineEvent> {
        let task = self.timeline.pop_due(now)?;
        let event = match task.event {
            AlertAction::Chorus(spec) => {
                if let Err(err) = backend.play_tones(&chorus_tones(spec)) {
                    warn!(error = %err, "tone repeat failed");
                }
                let mut spawned = Vec::new();
                self.speak_layers(backend, spec, task.due, &mut spawned);
                if let Some(session) = self.session.as_mut() {
                    session.pending.extend(spawned);
                }
                EngineEvent::Played
            }
            AlertAction::Speak(utterance) => {
                if let Err(err) = backend.speak(&utterance) {
                    warn!(error = %err, "speech layer failed");
                }
                EngineEvent::Played
            }
            AlertAction::ReplayClip => {
                let clip = self.session.as_ref().and_then(|session| session.clip.clone());
                if let Some(data_uri) = clip
                    && let Err(err) = backend.play_clip(&data_uri)
                {
                    warn!(error = %err, "custom clip repeat failed");
                }
                EngineEvent::Played
            }
            AlertAction::AutoStop => {
                let kind = self.session.as_ref().map(|session| session.kind);
                self.stop_alert(backend);
                match kind {
                    Some(kind) => EngineEvent::AutoStopped(kind),
                    None => EngineEvent::Played,
                }
            }
            AlertAction::EndPreview => {
                self.preview = None;
                backend.stop_clips();
                EngineEvent::PreviewEnded
            }
        };
        Some(event)
    }

    /// Speaks the first layer now and staggers the rest. Returns false when the
    /// profile has nothing to say or the back end cannot speak.
    fn speak_layers(
        &mut self,
        backend: &mut dyn AudioBackend,
        spec: &AlertSpec,
        now: Millis,
        pending: &mut Vec<TaskId>,
    ) -> bool {
        let Some(text) = spec.voice_text else {
            return false;
        };
        if !backend.speech_available() {
            debug!(profile = spec.name, "speech unavailable, tone only");
            return false;
        }
        let voices = backend.voices();
        let voice = preferred_voice(&voices).map(|voice| voice.name.clone());
        for (index, utterance) in voice_layers(spec, text, voice).into_iter().enumerate() {
            if index == 0 {
                if let Err(err) = backend.speak(&utterance) {
                    warn!(error = %err, "speech layer failed");
                }
                continue;
            }
            let due = now + index as Millis * SPEECH_STAGGER_MS;
            pending.push(self.timeline.schedule_once(due, AlertAction::Speak(utterance)));
        }
        true
    }
}

pub fn repeat_interval_ms(spec: &AlertSpec) -> Millis {
    (f64::from(spec.tone_duration_sec) * 1000.0).round() as Millis + REPEAT_GAP_MS
}

/// Repeats after the first burst that still fit inside the alert window.
pub fn repeat_total(spec: &AlertSpec) -> Millis {
    (ALERT_WINDOW_MS / repeat_interval_ms(spec)).saturating_sub(1)
}

pub fn chorus_tones(spec: &AlertSpec) -> Vec<Tone> {
    let duration = Duration::from_secs_f32(spec.tone_duration_sec);
    [0.95_f32, 1.0, 1.05]
        .iter()
        .enumerate()
        .map(|(index, factor)| Tone {
            frequency_hz: spec.tone_frequency_hz * factor,
            start_offset: Duration::from_millis(index as u64 * TONE_STAGGER_MS),
            duration,
            gain_start: 0.6,
            gain_end: 0.2,
        })
        .collect()
}

pub fn voice_layers(spec: &AlertSpec, text: &str, voice: Option<String>) -> Vec<Utterance> {
    let preset = spec.voice_preset();
    [-0.1_f32, 0.0, 0.1]
        .iter()
        .map(|delta| Utterance {
            text: text.to_string(),
            language: SPEECH_LANGUAGE.to_string(),
            rate: preset.rate,
            pitch: (preset.base_pitch + delta).clamp(0.1, 2.0),
            volume: preset.volume,
            voice: voice.clone(),
        })
        .collect()
}

pub fn preferred_voice(voices: &[VoiceInfo]) -> Option<&VoiceInfo> {
    let english = |voice: &&VoiceInfo| voice.language.starts_with("en");
    voices
        .iter()
        .filter(english)
        .find(|voice| {
            let name = voice.name.to_lowercase();
            ["male", "david", "mark"].iter().any(|hint| name.contains(hint))
        })
        .or_else(|| voices.iter().find(english))
}
