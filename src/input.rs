use tracing::{debug, warn};

use crate::alert::AudioBackend;
use crate::bridge::NotificationAction;
use crate::error::WatchResult;
use crate::mode::Mode;
use crate::surface::RenderSurface;
use crate::tick::Millis;
use crate::watch::{Button, Watch};

/// One line of keyboard input, already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Press(Button),
    Escape,
    Answer(NotificationAction),
    Preview,
    AlarmTime(String),
    AlarmEnabled(bool),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub const HELP: &str = "keys: c w t a (modes), s start/stop, r reset, e set, g config, \
x escape, z snooze, d dismiss, p preview, alarm HH:MM, alarm on|off, q quit";

/// Single keys map to the watch buttons; `alarm ...` edits the alarm.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("alarm ") {
        return match rest.trim() {
            "on" => Some(Command::AlarmEnabled(true)),
            "off" => Some(Command::AlarmEnabled(false)),
            time => Some(Command::AlarmTime(time.to_string())),
        };
    }
    let command = match line {
        "c" => Command::Press(Button::Mode(Mode::Clock)),
        "w" => Command::Press(Button::Mode(Mode::Stopwatch)),
        "t" => Command::Press(Button::Mode(Mode::Timer)),
        "a" => Command::Press(Button::Mode(Mode::Alarm)),
        "s" => Command::Press(Button::StartStop),
        "r" => Command::Press(Button::Reset),
        "e" => Command::Press(Button::Set),
        "g" => Command::Press(Button::Config),
        "x" | "esc" | "\u{1b}" => Command::Escape,
        "z" => Command::Answer(NotificationAction::Snooze),
        "d" => Command::Answer(NotificationAction::Dismiss),
        "p" => Command::Preview,
        "q" | "quit" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

pub fn apply<R: RenderSurface, A: AudioBackend>(
    watch: &mut Watch<R, A>,
    command: Command,
    now_ms: Millis,
) -> WatchResult<Flow> {
    debug!(?command, "input");
    match command {
        Command::Press(button) => watch.press(button, now_ms),
        Command::Escape => watch.escape(),
        Command::Answer(action) => watch.answer_alarm(action)?,
        Command::Preview => watch.preview_custom_audio(now_ms)?,
        Command::AlarmTime(time) => watch.set_alarm_time(&time)?,
        Command::AlarmEnabled(enabled) => watch.set_alarm_enabled(enabled),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Parses and applies one line; bad input is reported and skipped.
pub fn handle_line<R: RenderSurface, A: AudioBackend>(
    watch: &mut Watch<R, A>,
    line: &str,
    now_ms: Millis,
) -> Flow {
    if line.trim().is_empty() {
        return Flow::Continue;
    }
    let Some(command) = parse_command(line) else {
        warn!(input = line.trim(), "unknown key; {HELP}");
        return Flow::Continue;
    };
    match apply(watch, command, now_ms) {
        Ok(flow) => flow,
        Err(err) => {
            warn!(error = %err, "command failed");
            Flow::Continue
        }
    }
}
