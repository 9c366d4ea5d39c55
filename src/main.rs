use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cockpit_watch::alert::{AudioBackend, TerminalAudio};
use cockpit_watch::alert::custom::mime_for_path;
use cockpit_watch::bridge::{BackgroundWorker, BridgeClient, LogNotifier, WorkerConfig};
use cockpit_watch::diagnostics;
use cockpit_watch::input::{Flow, handle_line};
use cockpit_watch::mode::Mode;
use cockpit_watch::settings::model::{parse_settings_text, settings_to_text};
use cockpit_watch::settings::{JsonFileStore, KeyValueStore, PersistedSettings, SETTINGS_KEY};
use cockpit_watch::surface::{ConsoleSurface, RenderSurface};
use cockpit_watch::time_provider::{HostClock, SystemClock};
use cockpit_watch::{Button, Watch};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliMode {
    Clock,
    Stopwatch,
    Timer,
    Alarm,
}

impl From<CliMode> for Mode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Clock => Mode::Clock,
            CliMode::Stopwatch => Mode::Stopwatch,
            CliMode::Timer => Mode::Timer,
            CliMode::Alarm => Mode::Alarm,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "cockpit-watch",
    version,
    about = "Aviation-style clock, stopwatch, timer and alarm for the terminal"
)]
struct Cli {
    #[arg(long, default_value = "cockpit-watch.json")]
    settings: PathBuf,

    #[arg(long, value_enum, default_value_t = CliMode::Clock)]
    mode: CliMode,

    /// Press START once the mode is selected.
    #[arg(long)]
    start: bool,

    /// Seconds to run before exiting; runs until interrupted when absent.
    #[arg(long)]
    ticks: Option<u64>,

    #[arg(long)]
    upload_audio: Option<PathBuf>,

    /// Overrides the MIME type guessed from the upload's extension.
    #[arg(long, requires = "upload_audio")]
    mime: Option<String>,

    #[arg(long, value_name = "HH:MM")]
    alarm_time: Option<String>,

    #[arg(long)]
    alarm_enabled: Option<bool>,

    #[arg(long, value_name = "PROFILE")]
    alarm_sound: Option<String>,

    #[arg(long)]
    timer_minutes: Option<u32>,

    #[arg(long)]
    timer_seconds: Option<u32>,

    /// Seconds left on the timer when the warning sounds.
    #[arg(long, value_name = "SECONDS")]
    timer_warning: Option<u32>,

    #[arg(long, value_name = "PROFILE")]
    timer_warning_sound: Option<String>,

    /// Elapsed stopwatch time that sounds the stopwatch alarm.
    #[arg(long, value_name = "HH:MM:SS")]
    stopwatch_alarm: Option<String>,

    #[arg(long)]
    stopwatch_alarm_enabled: Option<bool>,

    #[arg(long, value_name = "PROFILE")]
    stopwatch_alarm_sound: Option<String>,

    #[arg(long)]
    format_24h: Option<bool>,

    #[arg(long)]
    show_seconds: Option<bool>,

    /// Play the saved custom audio once.
    #[arg(long)]
    preview: bool,

    #[arg(long)]
    print_settings: bool,

    #[arg(long)]
    diagnostics: bool,

    #[arg(long)]
    no_background: bool,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let store = JsonFileStore::new(&cli.settings);
    let settings = read_settings(&store)
        .with_context(|| format!("failed to load {}", cli.settings.display()))?;

    let clock: Arc<dyn HostClock> = Arc::new(SystemClock::new());
    let worker = (!cli.no_background).then(|| {
        BackgroundWorker::start(WorkerConfig::default(), Arc::clone(&clock), Box::new(LogNotifier))
    });
    let mut bridge = worker
        .as_ref()
        .map(|worker| BridgeClient::connected(worker.sender()))
        .unwrap_or_else(BridgeClient::offline);

    if cli.diagnostics {
        return diagnostics::run_diagnostics(clock.as_ref(), &settings, &mut bridge);
    }

    let sample = clock.sample();
    let mut watch = Watch::start(
        Box::new(store),
        ConsoleSurface::stdout(),
        TerminalAudio::stderr(),
        bridge,
        sample.monotonic_ms,
        sample.wall,
    );

    if let Some(path) = cli.upload_audio.as_ref() {
        let mime = match cli.mime.as_deref() {
            Some(mime) => mime,
            None => mime_for_path(path)
                .with_context(|| format!("cannot tell the audio type of {}", path.display()))?,
        };
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("custom audio");
        watch
            .upload_custom_audio(name, mime, &bytes)
            .with_context(|| format!("failed to upload {}", path.display()))?;
    }

    apply_setting_flags(&cli, &mut watch)?;

    let now = clock.monotonic_ms();
    if cli.preview {
        watch.preview_custom_audio(now).context("preview failed")?;
    }
    let mode = Mode::from(cli.mode);
    if mode != Mode::Clock {
        watch.press(Button::Mode(mode), now);
    }
    if cli.start {
        watch.press(Button::StartStop, now);
    }

    if cli.print_settings {
        println!("{}", settings_to_text(watch.settings())?);
        if cli.ticks.is_none() {
            return Ok(());
        }
    }

    let end_ms = cli
        .ticks
        .map(|ticks| clock.monotonic_ms().saturating_add(ticks.saturating_mul(1_000)));
    info!(?mode, ticks = ?cli.ticks, "running");
    let input = spawn_input_reader();
    run_loop(&mut watch, clock.as_ref(), &input, end_ms);
    drop(watch);
    drop(worker);
    Ok(())
}

/// Sleeps on the keyboard channel until the next due task, so a key is
/// handled as soon as it arrives. Closed input leaves only the timeline.
fn run_loop<R: RenderSurface, A: AudioBackend>(
    watch: &mut Watch<R, A>,
    clock: &dyn HostClock,
    input: &Receiver<String>,
    end_ms: Option<u64>,
) {
    let mut input_open = true;
    loop {
        let now_ms = clock.monotonic_ms();
        if end_ms.is_some_and(|end| now_ms >= end) {
            break;
        }
        let next_ms = watch
            .next_due()
            .unwrap_or(now_ms + 1_000)
            .min(end_ms.unwrap_or(u64::MAX));
        let wait = Duration::from_millis(next_ms.saturating_sub(now_ms));
        let line = if input_open {
            match input.recv_timeout(wait) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("input closed");
                    input_open = false;
                    None
                }
            }
        } else {
            thread::sleep(wait);
            None
        };

        let sample = clock.sample();
        watch.pump(sample.monotonic_ms, sample.wall);
        if let Some(line) = line
            && handle_line(watch, &line, sample.monotonic_ms) == Flow::Quit
        {
            break;
        }
    }
}

/// Lines from stdin on a channel; the thread ends with the input.
fn spawn_input_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!(error = %err, "stopped reading input");
                    break;
                }
            }
        }
    });
    receiver
}

fn apply_setting_flags<R: RenderSurface, A: AudioBackend>(
    cli: &Cli,
    watch: &mut Watch<R, A>,
) -> Result<()> {
    if let Some(time) = cli.alarm_time.as_deref() {
        watch.set_alarm_time(time).context("invalid --alarm-time")?;
    }
    if let Some(enabled) = cli.alarm_enabled {
        watch.set_alarm_enabled(enabled);
    }
    if let Some(sound) = cli.alarm_sound.as_deref() {
        watch.set_alarm_sound(sound).context("invalid --alarm-sound")?;
    }
    if cli.timer_minutes.is_some() || cli.timer_seconds.is_some() {
        let minutes = cli.timer_minutes.unwrap_or(watch.settings().timer_minutes);
        let seconds = cli.timer_seconds.unwrap_or(watch.settings().timer_seconds);
        watch
            .set_timer_duration(minutes, seconds)
            .context("invalid timer duration")?;
    }
    if let Some(seconds) = cli.timer_warning {
        watch.set_timer_warning_time(seconds);
    }
    if let Some(sound) = cli.timer_warning_sound.as_deref() {
        watch
            .set_timer_warning_sound(sound)
            .context("invalid --timer-warning-sound")?;
    }
    if let Some(time) = cli.stopwatch_alarm.as_deref() {
        watch
            .set_stopwatch_alarm_time(time)
            .context("invalid --stopwatch-alarm")?;
    }
    if let Some(enabled) = cli.stopwatch_alarm_enabled {
        watch.set_stopwatch_alarm_enabled(enabled);
    }
    if let Some(sound) = cli.stopwatch_alarm_sound.as_deref() {
        watch
            .set_stopwatch_alarm_sound(sound)
            .context("invalid --stopwatch-alarm-sound")?;
    }
    if let Some(format_24h) = cli.format_24h {
        watch.set_format_24h(format_24h);
    }
    if let Some(show_seconds) = cli.show_seconds {
        watch.set_show_seconds(show_seconds);
    }
    Ok(())
}

/// Stricter than the watch's own load: a settings file that exists but cannot
/// be read is an error here rather than a silent reset to defaults.
fn read_settings(store: &JsonFileStore) -> Result<PersistedSettings> {
    let raw = store.get(SETTINGS_KEY)?;
    match raw {
        Some(raw) => parse_settings_text(&raw),
        None => Ok(PersistedSettings::default()),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        bail!("failed to install logger: {err}");
    }
    Ok(())
}
