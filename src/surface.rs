use std::io::{self, Write};

use tracing::warn;

use crate::format::mode_label;
use crate::instruments::InstrumentReadout;
use crate::mode::{ButtonLayout, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Battery,
    Alarm,
    Alerting,
    Timer,
}

/// Everything the watch pushes to its display. Calls only update what is
/// shown; `present` is called once the state of a pump is settled.
pub trait RenderSurface {
    fn show_time(&mut self, text: &str);
    fn show_date(&mut self, text: &str);
    fn show_mode(&mut self, mode: Mode);
    fn set_led(&mut self, led: Led, lit: bool);
    fn flash(&mut self);
    fn show_buttons(&mut self, layout: ButtonLayout);
    fn show_instruments(&mut self, readout: &InstrumentReadout);
    fn toggle_config(&mut self);
    fn show_message(&mut self, text: &str);
    fn present(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub time: String,
    pub date: String,
    pub mode: Mode,
    pub battery_led: bool,
    pub alarm_led: bool,
    pub alerting_led: bool,
    pub timer_led: bool,
    pub buttons: Option<ButtonLayout>,
    pub instruments: Option<InstrumentReadout>,
    pub config_open: bool,
    pub flashes: u32,
    pub messages: Vec<String>,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            time: String::new(),
            date: String::new(),
            mode: Mode::Clock,
            battery_led: false,
            alarm_led: false,
            alerting_led: false,
            timer_led: false,
            buttons: None,
            instruments: None,
            config_open: false,
            flashes: 0,
            messages: Vec::new(),
        }
    }
}

impl Frame {
    pub fn status_line(&self) -> String {
        let led = |lit: bool, mark: char| if lit { mark } else { '.' };
        let mut line = format!(
            "[{:<9}] {} | {} | {}{}{}{}",
            mode_label(self.mode),
            self.time,
            self.date,
            led(self.battery_led, 'B'),
            led(self.alarm_led, 'A'),
            led(self.alerting_led, '!'),
            led(self.timer_led, 'T'),
        );
        if let Some(buttons) = self.buttons {
            let labels: Vec<&str> = [
                buttons.start_stop,
                buttons.reset.then_some("RESET"),
                buttons.set,
            ]
            .into_iter()
            .flatten()
            .collect();
            if !labels.is_empty() {
                line.push_str(&format!(" | {}", labels.join(" ")));
            }
        }
        if let Some(readout) = &self.instruments {
            line.push_str(&format!(
                " | {} {} {}",
                readout.altitude, readout.heading, readout.speed
            ));
        }
        line
    }
}

/// Prints one status line per change, plus flashes and messages as they come.
pub struct ConsoleSurface<W: Write = io::Stdout> {
    out: W,
    frame: Frame,
    last_line: Option<String>,
    pending_flash: bool,
    pending_messages: Vec<String>,
}

impl ConsoleSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            frame: Frame::default(),
            last_line: None,
            pending_flash: false,
            pending_messages: Vec::new(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!(error = %err, "console surface write failed");
        }
    }
}

impl<W: Write> RenderSurface for ConsoleSurface<W> {
    fn show_time(&mut self, text: &str) {
        self.frame.time = text.to_string();
    }

    fn show_date(&mut self, text: &str) {
        self.frame.date = text.to_string();
    }

    fn show_mode(&mut self, mode: Mode) {
        self.frame.mode = mode;
    }

    fn set_led(&mut self, led: Led, lit: bool) {
        let slot = match led {
            Led::Battery => &mut self.frame.battery_led,
            Led::Alarm => &mut self.frame.alarm_led,
            Led::Alerting => &mut self.frame.alerting_led,
            Led::Timer => &mut self.frame.timer_led,
        };
        *slot = lit;
    }

    fn flash(&mut self) {
        self.frame.flashes += 1;
        self.pending_flash = true;
    }

    fn show_buttons(&mut self, layout: ButtonLayout) {
        self.frame.buttons = Some(layout);
    }

    fn show_instruments(&mut self, readout: &InstrumentReadout) {
        self.frame.instruments = Some(readout.clone());
    }

    fn toggle_config(&mut self) {
        self.frame.config_open = !self.frame.config_open;
        let state = if self.frame.config_open { "open" } else { "closed" };
        self.pending_messages.push(format!("config panel {state}"));
    }

    fn show_message(&mut self, text: &str) {
        self.frame.messages.push(text.to_string());
        self.pending_messages.push(text.to_string());
    }

    fn present(&mut self) {
        for message in std::mem::take(&mut self.pending_messages) {
            self.write_line(&format!(">> {message}"));
        }
        if std::mem::take(&mut self.pending_flash) {
            self.write_line("** FLASH **");
        }
        let line = self.frame.status_line();
        if self.last_line.as_deref() != Some(line.as_str()) {
            self.write_line(&line);
            self.last_line = Some(line);
        }
    }
}
