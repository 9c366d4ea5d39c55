use rand::Rng;

const ALTITUDE_STEP_FT: f64 = 50.0;
const HEADING_STEP_DEG: f64 = 2.5;
const SPEED_STEP_KTS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruments {
    pub altitude_ft: f64,
    pub heading_deg: f64,
    pub speed_kts: f64,
}

impl Default for Instruments {
    fn default() -> Self {
        Self {
            altitude_ft: 10_000.0,
            heading_deg: 90.0,
            speed_kts: 250.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentReadout {
    pub altitude: String,
    pub heading: String,
    pub speed: String,
}

impl Instruments {
    /// One random-walk step; values stay inside what an airliner could show.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.altitude_ft += rng.gen_range(-ALTITUDE_STEP_FT..=ALTITUDE_STEP_FT);
        self.heading_deg += rng.gen_range(-HEADING_STEP_DEG..=HEADING_STEP_DEG);
        self.speed_kts += rng.gen_range(-SPEED_STEP_KTS..=SPEED_STEP_KTS);
        self.normalize();
    }

    fn normalize(&mut self) {
        self.altitude_ft = self.altitude_ft.clamp(0.0, 45_000.0);
        self.heading_deg = self.heading_deg.rem_euclid(360.0);
        self.speed_kts = self.speed_kts.clamp(0.0, 600.0);
    }

    pub fn readout(&self) -> InstrumentReadout {
        let heading = self.heading_deg.round() as u32 % 360;
        InstrumentReadout {
            altitude: format!("{} ft", group_thousands(self.altitude_ft.round() as u64)),
            heading: format!("{heading:03}°"),
            speed: format!("{} kts", self.speed_kts.round() as u64),
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
