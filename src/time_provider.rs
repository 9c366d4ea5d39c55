use std::time::Instant;

use chrono::{DateTime, FixedOffset, Local};

use crate::tick::Millis;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockSample {
    pub monotonic_ms: Millis,
    pub wall: DateTime<FixedOffset>,
}

/// Source of the two times the watch runs on: a monotonic millisecond counter
/// that drives the timeline, and the local wall clock used for display and
/// alarm matching.
pub trait HostClock: Send + Sync {
    fn monotonic_ms(&self) -> Millis;
    fn wall_now(&self) -> DateTime<FixedOffset>;
    fn label(&self) -> &'static str;

    fn sample(&self) -> ClockSample {
        ClockSample {
            monotonic_ms: self.monotonic_ms(),
            wall: self.wall_now(),
        }
    }
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    fn monotonic_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }

    fn wall_now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn label(&self) -> &'static str {
        "SYSTEM_LOCAL"
    }
}

#[cfg(test)]
pub(crate) use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, FixedOffset};

    use super::{ClockSample, HostClock};
    use crate::tick::Millis;

    /// Hand-driven clock; both times move together.
    pub(crate) struct ManualClock {
        state: Mutex<ClockSample>,
    }

    impl ManualClock {
        pub(crate) fn new(wall: DateTime<FixedOffset>) -> Self {
            Self {
                state: Mutex::new(ClockSample {
                    monotonic_ms: 0,
                    wall,
                }),
            }
        }

        pub(crate) fn advance(&self, ms: Millis) {
            if let Ok(mut state) = self.state.lock() {
                state.monotonic_ms += ms;
                state.wall += Duration::milliseconds(ms as i64);
            }
        }
    }

    impl HostClock for ManualClock {
        fn monotonic_ms(&self) -> Millis {
            self.state.lock().map(|state| state.monotonic_ms).unwrap_or(0)
        }

        fn wall_now(&self) -> DateTime<FixedOffset> {
            match self.state.lock() {
                Ok(state) => state.wall,
                Err(poisoned) => poisoned.into_inner().wall,
            }
        }

        fn label(&self) -> &'static str {
            "MANUAL"
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.monotonic_ms();
        thread::sleep(StdDuration::from_millis(2));
        let second = clock.monotonic_ms();
        assert!(second >= first);
        assert_eq!(clock.label(), "SYSTEM_LOCAL");
    }

    #[test]
    fn manual_clock_moves_both_times() {
        let start = FixedOffset::east_opt(3_600)
            .expect("offset")
            .with_ymd_and_hms(2026, 3, 9, 6, 59, 59)
            .single()
            .expect("valid");
        let clock = ManualClock::new(start);
        clock.advance(1_500);
        let sample = clock.sample();
        assert_eq!(sample.monotonic_ms, 1_500);
        assert_eq!(sample.wall, start + Duration::milliseconds(1_500));
    }
}
