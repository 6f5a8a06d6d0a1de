//! Per-level wave counts, enemy counts and toughness.

use warband_core::{ConfigurationError, LevelNumber, LevelProfile};

const STANDARD_PROFILES: [LevelProfile; 10] = [
    LevelProfile::new(2, 6, 1.0),
    LevelProfile::new(3, 8, 1.2),
    LevelProfile::new(3, 11, 1.5),
    LevelProfile::new(3, 14, 2.0),
    LevelProfile::new(3, 17, 2.5),
    LevelProfile::new(3, 20, 3.0),
    LevelProfile::new(3, 22, 3.5),
    LevelProfile::new(3, 24, 4.0),
    LevelProfile::new(3, 26, 4.5),
    LevelProfile::new(3, 28, 5.0),
];

/// Ordered level profiles; levels past the end reuse the last profile.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelRoster {
    levels: Vec<LevelProfile>,
}

impl LevelRoster {
    /// Creates a roster, rejecting empty rosters and unplayable levels.
    ///
    /// Every level needs at least one wave, at least one enemy per wave and a
    /// finite, positive HP multiplier.
    pub fn new(levels: Vec<LevelProfile>) -> Result<Self, ConfigurationError> {
        if levels.is_empty() {
            return Err(ConfigurationError::EmptyRoster);
        }
        for (index, profile) in levels.iter().enumerate() {
            let level = u32::try_from(index).map_or(u32::MAX, |index| index.saturating_add(1));
            if profile.waves == 0 {
                return Err(ConfigurationError::ZeroWaves { level });
            }
            if profile.enemies_per_wave == 0 {
                return Err(ConfigurationError::ZeroEnemies { level });
            }
            if !profile.hp_multiplier.is_finite() || profile.hp_multiplier <= 0.0 {
                return Err(ConfigurationError::InvalidHpMultiplier {
                    level,
                    multiplier: profile.hp_multiplier,
                });
            }
        }
        Ok(Self { levels })
    }

    /// Built-in ten-level roster.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            levels: STANDARD_PROFILES.to_vec(),
        }
    }

    /// Number of configured levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; rosters hold at least one level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Profile for the level, clamped into the configured range.
    #[must_use]
    pub fn profile(&self, level: LevelNumber) -> &LevelProfile {
        let index = (level.get().max(1) as usize - 1).min(self.levels.len() - 1);
        &self.levels[index]
    }
}

impl Default for LevelRoster {
    fn default() -> Self {
        Self::standard()
    }
}
