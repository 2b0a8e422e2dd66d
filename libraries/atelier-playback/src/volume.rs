//! Volume control with mute memory
//!
//! Volume is a 0-100 level. Muting is modelled as level 0; the level that was
//! active before muting is kept in `previous` so unmute can restore it.

/// Volume controller
#[derive(Debug, Clone)]
pub struct Volume {
    /// Current level (0-100)
    level: u8,

    /// Level to restore on unmute
    ///
    /// Only overwritten when the level leaves a non-zero value.
    previous: u8,

    /// Restore level used when `previous` is 0
    fallback: u8,
}

impl Volume {
    /// Create new volume controller
    ///
    /// # Arguments
    /// * `level` - Initial volume (0-100)
    /// * `fallback` - Level restored by unmute when nothing was remembered
    pub fn new(level: u8, fallback: u8) -> Self {
        let level = level.min(100);
        Self {
            level,
            previous: level,
            fallback: fallback.min(100),
        }
    }

    /// Set volume level (0-100)
    ///
    /// Zeroing a non-zero level remembers the old level for unmute.
    pub fn set_level(&mut self, level: u8) {
        let level = level.min(100);
        if level == 0 && self.level != 0 {
            self.previous = self.level;
        }
        self.level = level;
    }

    /// Shift the level by `delta`, saturating at 0 and 100
    pub fn adjust(&mut self, delta: i16) {
        let target = i16::from(self.level).saturating_add(delta).clamp(0, 100);
        self.set_level(target as u8);
    }

    /// Get current volume level (0-100)
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Level that unmute would restore
    pub fn previous(&self) -> u8 {
        self.previous
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        if self.level > 0 {
            self.previous = self.level;
            self.set_level(0);
        } else if self.previous > 0 {
            self.set_level(self.previous);
        } else {
            self.set_level(self.fallback);
        }
    }

    pub fn is_muted(&self) -> bool {
        self.level == 0
    }

    /// Linear gain handed to the output (0.0-1.0)
    pub fn gain(&self) -> f32 {
        f32::from(self.level) / 100.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(75, 75)
    }
}
