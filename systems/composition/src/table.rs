//! Sparse `(level, wave)` composition table with clamped, wave-walking lookup.

use std::collections::{btree_map::Entry, BTreeMap};

use tracing::warn;
use warband_core::{
    ConfigurationError, LevelNumber, RangedFraction, WaveComposition, WaveNumber, WeightedPool,
};

/// `(ranged basis points, melee pool, ranged pool)` for one wave of the built-in table.
type StandardWave = (u32, &'static [(&'static str, u32)], &'static [(&'static str, u32)]);

const LATE_MELEE: &[(&str, u32)] = &[
    ("elite_orc", 3),
    ("greatsword_skeleton", 2),
    ("armored_orc", 1),
];
const CASTERS: &[(&str, u32)] = &[("frost_wizard", 2), ("wizard", 2), ("skeleton_archer", 1)];
const CASTERS_HEAVY: &[(&str, u32)] = &[("frost_wizard", 2), ("wizard", 2), ("skeleton_archer", 2)];

const STANDARD_LEVELS: &[&[StandardWave]] = &[
    // Level 1: melee only.
    &[
        (0, &[("orc", 2), ("slime", 1)], &[]),
        (0, &[("orc", 2), ("slime", 1)], &[]),
    ],
    // Level 2: archers appear under a low ceiling.
    &[
        (
            1_000,
            &[("orc", 1), ("skeleton", 2), ("armored_skeleton", 1)],
            &[("skeleton_archer", 1)],
        ),
        (
            1_500,
            &[("skeleton", 2), ("armored_skeleton", 1), ("orc", 1)],
            &[("skeleton_archer", 3), ("wizard", 1)],
        ),
        (
            2_000,
            &[("skeleton", 2), ("armored_skeleton", 2), ("orc", 1)],
            &[("skeleton_archer", 2), ("wizard", 1)],
        ),
    ],
    // Level 3: heavier melee and frost wizards.
    &[
        (
            2_000,
            &[("werewolf", 2), ("armored_skeleton", 2), ("armored_orc", 1)],
            &[("frost_wizard", 1)],
        ),
        (
            2_500,
            &[("werewolf", 2), ("armored_orc", 2), ("armored_skeleton", 1)],
            &[("frost_wizard", 2), ("wizard", 1)],
        ),
        (
            3_000,
            &[("armored_orc", 2), ("werewolf", 2), ("armored_skeleton", 1)],
            &[("frost_wizard", 2), ("wizard", 1), ("skeleton_archer", 1)],
        ),
    ],
    // Level 4: elites.
    &[
        (
            2_500,
            &[("elite_orc", 2), ("greatsword_skeleton", 1), ("armored_orc", 2)],
            &[("frost_wizard", 2), ("wizard", 1)],
        ),
        (
            2_800,
            &[("elite_orc", 2), ("greatsword_skeleton", 2), ("armored_orc", 1)],
            CASTERS,
        ),
        (
            3_000,
            &[("elite_orc", 2), ("greatsword_skeleton", 2), ("armored_orc", 1)],
            CASTERS,
        ),
        (3_000, LATE_MELEE, CASTERS),
    ],
    // Level 5 and beyond.
    &[
        (3_000, LATE_MELEE, CASTERS),
        (3_300, LATE_MELEE, CASTERS_HEAVY),
        (3_500, LATE_MELEE, CASTERS_HEAVY),
        (3_500, LATE_MELEE, CASTERS_HEAVY),
        (
            3_500,
            LATE_MELEE,
            &[("frost_wizard", 3), ("wizard", 3), ("skeleton_archer", 2)],
        ),
    ],
];

const FALLBACK_MELEE: &[(&str, u32)] = &[("orc", 1), ("slime", 1)];

/// Static mapping from `(level, wave)` to the composition spawned there.
///
/// The table is sparse. Lookups clamp the level to the highest level present
/// and walk backward from the requested wave to the nearest defined one. When
/// nothing matches, a melee-only fallback composition is returned.
#[derive(Clone, Debug)]
pub struct CompositionTable {
    entries: BTreeMap<(u32, u32), WaveComposition>,
    fallback: WaveComposition,
}

impl CompositionTable {
    /// Builds a table from explicit entries.
    ///
    /// Entries must use one-based indices, carry a non-empty melee pool and
    /// appear at most once per `(level, wave)` key.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (LevelNumber, WaveNumber, WaveComposition)>,
    {
        let mut table = BTreeMap::new();
        for (level, wave, composition) in entries {
            if level.get() == 0 || wave.get() == 0 {
                return Err(ConfigurationError::ZeroIndex);
            }
            if composition.melee().is_empty() {
                return Err(ConfigurationError::EmptyPool);
            }
            match table.entry((level.get(), wave.get())) {
                Entry::Occupied(_) => {
                    return Err(ConfigurationError::DuplicateComposition {
                        level: level.get(),
                        wave: wave.get(),
                    })
                }
                Entry::Vacant(slot) => {
                    let _ = slot.insert(composition);
                }
            }
        }

        Ok(Self {
            entries: table,
            fallback: fallback_composition()?,
        })
    }

    /// Built-in five-level table shipped with the game.
    #[must_use]
    pub fn standard() -> Self {
        build_standard().expect("built-in composition table is valid")
    }

    /// Highest level with at least one composition.
    #[must_use]
    pub fn max_level(&self) -> Option<LevelNumber> {
        self.entries
            .keys()
            .next_back()
            .map(|&(level, _)| LevelNumber::new(level))
    }

    /// Composition declared for exactly this key, without any fallback.
    #[must_use]
    pub fn get(&self, level: LevelNumber, wave: WaveNumber) -> Option<&WaveComposition> {
        self.entries.get(&(level.get(), wave.get()))
    }

    /// Number of declared compositions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no composition has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Melee-only composition returned when no entry matches.
    #[must_use]
    pub fn fallback(&self) -> &WaveComposition {
        &self.fallback
    }

    /// Resolves the composition for a wave. Never fails.
    #[must_use]
    pub fn resolve(&self, level: LevelNumber, wave: WaveNumber) -> &WaveComposition {
        let Some(max_level) = self.max_level() else {
            warn!(%level, %wave, "composition table is empty; using fallback");
            return &self.fallback;
        };

        let clamped = level.get().min(max_level.get());
        if wave.get() == 0 {
            return &self.fallback;
        }

        match self
            .entries
            .range((clamped, 1)..=(clamped, wave.get()))
            .next_back()
        {
            Some((_, composition)) => composition,
            None => {
                warn!(%level, %wave, clamped, "no composition defined; using fallback");
                &self.fallback
            }
        }
    }
}

fn build_standard() -> Result<CompositionTable, ConfigurationError> {
    let mut entries = Vec::new();
    for (level_index, waves) in STANDARD_LEVELS.iter().enumerate() {
        for (wave_index, &(basis_points, melee, ranged)) in waves.iter().enumerate() {
            let composition = WaveComposition::new(
                WeightedPool::try_from_pairs(melee.iter().copied())?,
                WeightedPool::try_from_pairs(ranged.iter().copied())?,
                RangedFraction::from_basis_points(basis_points)?,
            );
            entries.push((
                LevelNumber::new(level_index as u32 + 1),
                WaveNumber::new(wave_index as u32 + 1),
                composition,
            ));
        }
    }
    CompositionTable::from_entries(entries)
}

fn fallback_composition() -> Result<WaveComposition, ConfigurationError> {
    let melee = WeightedPool::try_from_pairs(FALLBACK_MELEE.iter().copied())?;
    Ok(WaveComposition::melee_only(melee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warband_core::EnemyId;

    fn key(level: u32, wave: u32) -> (LevelNumber, WaveNumber) {
        (LevelNumber::new(level), WaveNumber::new(wave))
    }

    #[test]
    fn standard_table_builds() {
        let table = build_standard().expect("standard table");
        assert_eq!(table.len(), 17);
        assert_eq!(table.max_level(), Some(LevelNumber::new(5)));
    }

    #[test]
    fn level_one_never_reaches_ranged() {
        let table = CompositionTable::standard();
        for wave in 1..=4 {
            let (level, wave) = key(1, wave);
            let composition = table.resolve(level, wave);
            assert!(composition.max_ranged_fraction().is_zero());
            assert!(composition.ranged().is_empty());
        }
    }

    #[test]
    fn wave_zero_uses_fallback() {
        let table = CompositionTable::standard();
        let (level, wave) = key(3, 0);
        assert_eq!(table.resolve(level, wave), table.fallback());
    }

    #[test]
    fn missing_level_uses_fallback() {
        let melee = WeightedPool::try_from_pairs([("orc", 1)]).expect("pool");
        let table = CompositionTable::from_entries([(
            LevelNumber::new(3),
            WaveNumber::new(1),
            WaveComposition::melee_only(melee),
        )])
        .expect("table");

        let (level, wave) = key(2, 4);
        let fallback = table.resolve(level, wave);
        assert_eq!(fallback, table.fallback());
        assert!(fallback.melee().contains(&EnemyId::new("slime")));
        assert!(fallback.max_ranged_fraction().is_zero());
    }

    #[test]
    fn empty_table_uses_fallback() {
        let entries: Vec<(LevelNumber, WaveNumber, WaveComposition)> = Vec::new();
        let table = CompositionTable::from_entries(entries).expect("empty table");
        assert!(table.is_empty());
        assert_eq!(table.max_level(), None);
        let (level, wave) = key(1, 1);
        assert_eq!(table.resolve(level, wave), table.fallback());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let melee = WeightedPool::try_from_pairs([("orc", 1)]).expect("pool");
        let composition = WaveComposition::melee_only(melee);
        let error = CompositionTable::from_entries([
            (LevelNumber::new(1), WaveNumber::new(1), composition.clone()),
            (LevelNumber::new(1), WaveNumber::new(1), composition),
        ])
        .expect_err("duplicate must fail");
        assert_eq!(
            error,
            ConfigurationError::DuplicateComposition { level: 1, wave: 1 }
        );
    }

    #[test]
    fn empty_melee_pools_are_rejected() {
        let composition = WaveComposition::melee_only(WeightedPool::empty());
        let error =
            CompositionTable::from_entries([(LevelNumber::new(1), WaveNumber::new(1), composition)])
                .expect_err("empty melee must fail");
        assert_eq!(error, ConfigurationError::EmptyPool);
    }

    #[test]
    fn zero_indices_are_rejected() {
        let melee = WeightedPool::try_from_pairs([("orc", 1)]).expect("pool");
        let error = CompositionTable::from_entries([(
            LevelNumber::new(0),
            WaveNumber::new(1),
            WaveComposition::melee_only(melee),
        )])
        .expect_err("zero level must fail");
        assert_eq!(error, ConfigurationError::ZeroIndex);
    }
}
