use std::io::{self, Write};
use std::time::Duration;

use tracing::{debug, warn};

use crate::alert::custom::{decode_data_uri, wav_duration};
use crate::error::{WatchError, WatchResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub start_offset: Duration,
    pub duration: Duration,
    pub gain_start: f32,
    pub gain_end: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    pub language: String,
}

/// Sound and speech output. Every method returns immediately; playback is
/// the back end's business.
pub trait AudioBackend {
    fn play_tones(&mut self, tones: &[Tone]) -> WatchResult<()>;

    /// Starts a clip and reports its length when the back end can tell.
    fn play_clip(&mut self, data_uri: &str) -> WatchResult<Option<Duration>>;

    fn stop_clips(&mut self);

    fn speech_available(&self) -> bool;

    fn voices(&self) -> Vec<VoiceInfo>;

    fn speak(&mut self, utterance: &Utterance) -> WatchResult<()>;

    fn cancel_speech(&mut self);

    /// Last-resort notification when nothing else can sound.
    fn blocking_alert(&mut self, message: &str);
}

/// Rings the terminal bell and prints speech to stderr.
pub struct TerminalAudio<W: Write = io::Stderr> {
    out: W,
    speech: bool,
    clips_playing: usize,
}

impl TerminalAudio<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr(), true)
    }
}

impl<W: Write> TerminalAudio<W> {
    pub fn new(out: W, speech: bool) -> Self {
        Self {
            out,
            speech,
            clips_playing: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) -> WatchResult<()> {
        writeln!(self.out, "{line}")
            .and_then(|()| self.out.flush())
            .map_err(|err| WatchError::PlaybackFailure(format!("terminal unavailable: {err}")))
    }
}

impl<W: Write> AudioBackend for TerminalAudio<W> {
    fn play_tones(&mut self, tones: &[Tone]) -> WatchResult<()> {
        let Some(base) = tones.get(tones.len() / 2) else {
            return Ok(());
        };
        debug!(layers = tones.len(), hz = base.frequency_hz, "tone chorus");
        self.emit(&format!(
            "\x07[tone] {:.0} Hz x{} for {:.1}s",
            base.frequency_hz,
            tones.len(),
            base.duration.as_secs_f32()
        ))
    }

    fn play_clip(&mut self, data_uri: &str) -> WatchResult<Option<Duration>> {
        let (mime, bytes) = decode_data_uri(data_uri)?;
        let duration = wav_duration(&bytes);
        self.clips_playing += 1;
        self.emit(&format!("\x07[clip] {mime}, {} bytes", bytes.len()))?;
        Ok(duration)
    }

    fn stop_clips(&mut self) {
        if self.clips_playing > 0 {
            debug!(clips = self.clips_playing, "stopping clips");
        }
        self.clips_playing = 0;
    }

    fn speech_available(&self) -> bool {
        self.speech
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        if !self.speech {
            return Vec::new();
        }
        vec![VoiceInfo {
            name: "Terminal".to_string(),
            language: "en-US".to_string(),
        }]
    }

    fn speak(&mut self, utterance: &Utterance) -> WatchResult<()> {
        if !self.speech {
            return Err(WatchError::PlaybackFailure("speech disabled".to_string()));
        }
        self.emit(&format!(
            "[voice {:.2}] {}",
            utterance.pitch, utterance.text
        ))
    }

    fn cancel_speech(&mut self) {}

    fn blocking_alert(&mut self, message: &str) {
        if let Err(err) = self.emit(&format!("\x07\x07\x07 {message}")) {
            warn!(error = %err, message, "blocking alert could not be shown");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::custom::{accept_upload, test_wav};

    #[test]
    fn terminal_rings_bell_for_tones() {
        let mut audio = TerminalAudio::new(Vec::new(), false);
        let tone = Tone {
            frequency_hz: 800.0,
            start_offset: Duration::ZERO,
            duration: Duration::from_millis(500),
            gain_start: 0.6,
            gain_end: 0.2,
        };
        audio.play_tones(&[tone]).expect("tones");
        let text = String::from_utf8(audio.into_inner()).expect("utf8");
        assert!(text.starts_with('\x07'));
        assert!(text.contains("800 Hz"));
    }

    #[test]
    fn terminal_reports_wav_clip_length() {
        let upload = accept_upload("two.wav", "audio/wav", &test_wav(2)).expect("upload");
        let mut audio = TerminalAudio::new(Vec::new(), true);
        let duration = audio.play_clip(&upload.data_uri).expect("clip");
        assert_eq!(duration, Some(Duration::from_secs(2)));
    }

    #[test]
    fn terminal_without_speech_refuses_utterances() {
        let mut audio = TerminalAudio::new(Vec::new(), false);
        assert!(audio.voices().is_empty());
        let utterance = Utterance {
            text: "TERRAIN".to_string(),
            language: "en-US".to_string(),
            rate: 0.8,
            pitch: 0.5,
            volume: 0.8,
            voice: None,
        };
        assert!(audio.speak(&utterance).is_err());
    }
}
