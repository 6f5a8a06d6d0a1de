//! TOML campaign files describing the level roster and composition table.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use warband_core::{
    LevelNumber, LevelProfile, RangedFraction, WaveComposition, WaveNumber, WeightedEntry,
    WeightedPool,
};
use warband_system_composition::{CompositionTable, LevelRoster};

const SUPPORTED_CAMPAIGN_VERSION: u32 = 1;

/// Campaign file as written on disk.
///
/// Either section may be omitted, in which case the built-in roster or
/// composition table is used for it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CampaignConfig {
    version: u32,
    #[serde(default)]
    levels: Vec<LevelEntry>,
    #[serde(default)]
    compositions: Vec<CompositionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelEntry {
    waves: u32,
    enemies_per_wave: u32,
    #[serde(default = "unit_multiplier")]
    hp_multiplier: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompositionEntry {
    level: u32,
    wave: u32,
    melee: Vec<PoolEntry>,
    #[serde(default)]
    ranged: Vec<PoolEntry>,
    #[serde(default)]
    max_ranged_fraction: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoolEntry {
    enemy: String,
    weight: u32,
}

const fn unit_multiplier() -> f32 {
    1.0
}

/// Roster and composition table ready for the wave planner.
#[derive(Debug)]
pub(crate) struct Campaign {
    pub(crate) table: CompositionTable,
    pub(crate) roster: LevelRoster,
}

impl Campaign {
    /// Built-in campaign.
    pub(crate) fn standard() -> Self {
        Self {
            table: CompositionTable::standard(),
            roster: LevelRoster::standard(),
        }
    }

    /// Loads the campaign at `path`, or the built-in campaign when absent.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => CampaignConfig::from_path(path)?.build(),
            None => Ok(Self::standard()),
        }
    }
}

impl CampaignConfig {
    /// Reads and parses the campaign file at `path`.
    pub(crate) fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read campaign file at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid campaign file at {}", path.display()))
    }

    /// Parses campaign TOML and checks its version.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse campaign toml contents")?;
        if config.version != SUPPORTED_CAMPAIGN_VERSION {
            bail!(
                "unsupported campaign version {}; expected {}",
                config.version,
                SUPPORTED_CAMPAIGN_VERSION
            );
        }
        Ok(config)
    }

    /// Validates the file into a roster and composition table.
    pub(crate) fn build(self) -> Result<Campaign> {
        let roster = if self.levels.is_empty() {
            LevelRoster::standard()
        } else {
            let profiles = self
                .levels
                .iter()
                .map(|level| {
                    LevelProfile::new(level.waves, level.enemies_per_wave, level.hp_multiplier)
                })
                .collect();
            LevelRoster::new(profiles).context("invalid level roster")?
        };

        let table = if self.compositions.is_empty() {
            CompositionTable::standard()
        } else {
            let mut entries = Vec::with_capacity(self.compositions.len());
            for entry in self.compositions {
                let (level, wave) = (entry.level, entry.wave);
                let composition = entry.into_composition().with_context(|| {
                    format!("invalid composition for level {level} wave {wave}")
                })?;
                entries.push((LevelNumber::new(level), WaveNumber::new(wave), composition));
            }
            CompositionTable::from_entries(entries).context("invalid composition table")?
        };

        Ok(Campaign { table, roster })
    }
}

impl CompositionEntry {
    fn into_composition(self) -> Result<WaveComposition> {
        let fraction = RangedFraction::from_ratio(self.max_ranged_fraction)?;
        Ok(WaveComposition::new(
            build_pool(self.melee)?,
            build_pool(self.ranged)?,
            fraction,
        ))
    }
}

fn build_pool(entries: Vec<PoolEntry>) -> Result<WeightedPool> {
    let entries = entries
        .into_iter()
        .map(|entry| WeightedEntry::try_from_parts(entry.enemy, entry.weight))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WeightedPool::new(entries))
}
