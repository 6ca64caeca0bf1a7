// Percent volume mapped onto a decibel gain
// 0% is a hard mute, 100% is exactly the configured ceiling, linear in dB in between

/// Gain at 1%; below this the curve gives way to silence at 0%.
pub const MIN_GAIN_DB: f32 = -60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeControl {
    percent: f64,
    muted: bool,
    max_gain_db: f32,
}

impl VolumeControl {
    pub fn new(percent: f64, max_gain_db: f32) -> Self {
        let mut volume = Self {
            percent: 0.0,
            muted: false,
            max_gain_db: max_gain_db.max(MIN_GAIN_DB),
        };
        volume.set_percent(percent);
        volume
    }

    /// Store a new level, clamped to [0, 100]. NaN leaves the level alone.
    pub fn set_percent(&mut self, percent: f64) -> f64 {
        if !percent.is_nan() {
            self.percent = percent.clamp(0.0, 100.0);
        }
        self.percent
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn is_silent(&self) -> bool {
        self.muted || self.percent <= 0.0
    }

    pub fn max_gain_db(&self) -> f32 {
        self.max_gain_db
    }

    /// Gain in dB, `None` when output is silenced.
    pub fn gain_db(&self) -> Option<f32> {
        if self.is_silent() {
            return None;
        }
        let fraction = (self.percent / 100.0) as f32;
        Some(MIN_GAIN_DB + (self.max_gain_db - MIN_GAIN_DB) * fraction)
    }

    /// Linear multiplier applied to each sample.
    pub fn amplitude(&self) -> f32 {
        match self.gain_db() {
            Some(db) => 10f32.powf(db / 20.0),
            None => 0.0,
        }
    }
}
