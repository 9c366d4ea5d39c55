#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Priority {
    Critical,
    Warning,
    Caution,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoicePreset {
    pub rate: f32,
    pub base_pitch: f32,
    pub volume: f32,
}

impl VoicePreset {
    /// Windshear speaks slower and lower than the other critical callouts.
    pub fn for_profile(name: &str, priority: Option<Priority>) -> Self {
        let (rate, base_pitch) = match (name, priority) {
            ("windshear", _) => (0.65, 0.35),
            (_, Some(Priority::Critical)) => (0.7, 0.4),
            (_, Some(Priority::Warning)) => (0.8, 0.5),
            (_, Some(Priority::Caution)) => (0.75, 0.45),
            (_, None) => (0.9, 0.6),
        };
        Self {
            rate,
            base_pitch,
            volume: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertSpec {
    pub name: &'static str,
    pub tone_frequency_hz: f32,
    pub tone_duration_sec: f32,
    pub repeat_count: u32,
    pub voice_text: Option<&'static str>,
    pub priority: Option<Priority>,
}

impl AlertSpec {
    const fn tone(name: &'static str, hz: f32, seconds: f32, repeats: u32) -> Self {
        Self {
            name,
            tone_frequency_hz: hz,
            tone_duration_sec: seconds,
            repeat_count: repeats,
            voice_text: None,
            priority: None,
        }
    }

    const fn voiced(
        name: &'static str,
        hz: f32,
        seconds: f32,
        repeats: u32,
        text: &'static str,
        priority: Priority,
    ) -> Self {
        Self {
            name,
            tone_frequency_hz: hz,
            tone_duration_sec: seconds,
            repeat_count: repeats,
            voice_text: Some(text),
            priority: Some(priority),
        }
    }

    pub fn voice_preset(&self) -> VoicePreset {
        VoicePreset::for_profile(self.name, self.priority)
    }
}

pub const DEFAULT_PROFILE: &str = "beep";
pub const CUSTOM_PROFILE: &str = "custom";

pub static CATALOG: [AlertSpec; 9] = [
    AlertSpec::tone("beep", 800.0, 0.5, 3),
    AlertSpec::tone("cockpit", 1000.0, 0.3, 5),
    AlertSpec::tone("radio", 600.0, 0.8, 2),
    AlertSpec::tone("warning", 1200.0, 0.4, 4),
    AlertSpec::tone("chime", 440.0, 1.0, 2),
    AlertSpec::voiced("pullup", 800.0, 0.8, 3, "PULL UP, PULL UP", Priority::Critical),
    AlertSpec::voiced("terrain", 900.0, 0.7, 4, "TERRAIN, TERRAIN", Priority::Warning),
    AlertSpec::voiced(
        "bankangle",
        750.0,
        0.6,
        3,
        "BANK ANGLE, BANK ANGLE",
        Priority::Caution,
    ),
    AlertSpec::voiced(
        "windshear",
        1100.0,
        0.9,
        2,
        "WINDSHEAR, WINDSHEAR",
        Priority::Critical,
    ),
];

pub fn lookup(name: &str) -> Option<&'static AlertSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}

/// Unknown names resolve to the default beep.
pub fn resolve(name: &str) -> &'static AlertSpec {
    lookup(name).unwrap_or(&CATALOG[0])
}

pub fn is_known_profile(name: &str) -> bool {
    name == CUSTOM_PROFILE || lookup(name).is_some()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AlertKind {
    Alarm,
    TimerExpiry,
    TimerWarning,
    StopwatchThreshold,
}

impl AlertKind {
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Alarm => "alarm",
            AlertKind::TimerExpiry => "timer-expiry",
            AlertKind::TimerWarning => "timer-warning",
            AlertKind::StopwatchThreshold => "stopwatch-threshold",
        }
    }
}
