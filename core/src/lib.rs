#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Warband progression director.
//!
//! This crate defines the message surface that connects adapters and the pure
//! progression systems. Adapters submit [`Command`] values describing desired
//! work, systems react to [`Event`] streams and commands deterministically, and
//! respond exclusively with new events. The data model covers the static wave
//! composition configuration, the pending reward buffer owned by a session and
//! the persisted player progress that only the economy flush mutates.

use std::{fmt, num::NonZeroU32, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum XP required for the first level-up of a fresh profile.
pub const STARTING_MAX_XP: u64 = 100;

/// Number of basis points that represent a ranged fraction of one.
pub const BASIS_POINTS_PER_UNIT: u32 = 10_000;

/// Describes whether the owning session is allowed to commit progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Gameplay is running and economy flushes commit normally.
    #[default]
    Active,
    /// Gameplay is paused; flushes are silent no-ops.
    Paused,
}

impl SessionState {
    /// Reports whether the session currently accepts commits.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Commands that express all permissible requests to the progression systems.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Requests the enemy roster for a wave about to start.
    PlanWave {
        /// Level the wave belongs to.
        level: LevelNumber,
        /// One-based wave index within the level.
        wave: WaveNumber,
        /// Number of players participating in the session.
        players: NonZeroU32,
    },
    /// Banks coins into the pending economy buffer.
    AwardCoins {
        /// Number of coins gained.
        amount: u64,
    },
    /// Banks experience into the pending economy buffer.
    AwardXp {
        /// Amount of experience gained.
        amount: u64,
    },
    /// Requests an immediate flush of the pending economy buffer.
    FlushEconomy,
    /// Reports that the player cleared every wave of a stage.
    RecordStageCleared {
        /// Stage (level) that was cleared.
        stage: LevelNumber,
    },
}

/// Events broadcast by the progression systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the owning session was paused or resumed.
    SessionStateChanged {
        /// State that became active.
        state: SessionState,
    },
    /// Publishes the enemy roster resolved for a wave.
    WavePlanned {
        /// Fully drawn roster for the wave.
        plan: WavePlan,
    },
    /// Confirms that pending coins were committed to the persisted total.
    CoinsCommitted {
        /// Persisted coin total after the commit.
        total: u64,
    },
    /// Confirms that pending experience was committed without a level-up.
    XpCommitted {
        /// Persisted experience after the commit.
        xp: u64,
        /// Experience threshold of the current level.
        max_xp: u64,
    },
    /// Announces a single level-up step. Emitted at most once per flush.
    LeveledUp {
        /// Level reached by the step.
        level: u32,
        /// Experience threshold of the new level.
        max_xp: u64,
    },
}

/// Errors raised by malformed static configuration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigurationError {
    /// A weighted pool with no entries was consulted or configured.
    #[error("weighted pool is empty")]
    EmptyPool,
    /// A pool entry declared a weight of zero.
    #[error("weight for `{enemy}` must be positive")]
    ZeroWeight {
        /// Enemy whose weight was zero.
        enemy: EnemyId,
    },
    /// A ranged fraction outside `[0, 1]` was supplied.
    #[error("ranged fraction {0} lies outside [0, 1]")]
    FractionOutOfRange(f64),
    /// Two compositions were declared for the same level and wave.
    #[error("composition for level {level} wave {wave} declared twice")]
    DuplicateComposition {
        /// Level of the duplicated key.
        level: u32,
        /// Wave of the duplicated key.
        wave: u32,
    },
    /// A level or wave index of zero was supplied.
    #[error("level and wave indices start at 1")]
    ZeroIndex,
    /// A level roster with no levels was supplied.
    #[error("level roster is empty")]
    EmptyRoster,
    /// A level profile declared zero waves.
    #[error("level {level} must declare at least one wave")]
    ZeroWaves {
        /// One-based level index of the offending profile.
        level: u32,
    },
    /// A level profile declared zero enemies per wave.
    #[error("level {level} must spawn at least one enemy per wave")]
    ZeroEnemies {
        /// One-based level index of the offending profile.
        level: u32,
    },
    /// A level profile declared a non-finite or non-positive HP multiplier.
    #[error("level {level} hp multiplier {multiplier} must be finite and positive")]
    InvalidHpMultiplier {
        /// One-based level index of the offending profile.
        level: u32,
        /// Rejected multiplier.
        multiplier: f32,
    },
    /// A progress record declared a maximum XP of zero.
    #[error("maximum xp must be positive")]
    ZeroMaxXp,
    /// A progress record declared an experience value at or above its threshold.
    #[error("xp {xp} must stay below max xp {max_xp}")]
    XpAboveThreshold {
        /// Offending experience value.
        xp: u64,
        /// Threshold that was exceeded.
        max_xp: u64,
    },
}

/// Identifier naming an enemy archetype, for example `"skeleton_archer"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyId(String);

impl EnemyId {
    /// Creates a new enemy identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relative likelihood of an entry within its own pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weight(NonZeroU32);

impl Weight {
    /// Wraps a non-zero weight.
    #[must_use]
    pub const fn new(value: NonZeroU32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric weight.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0.get()
    }
}

/// Single `(enemy, weight)` pair of a [`WeightedPool`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedEntry {
    enemy: EnemyId,
    weight: Weight,
}

impl WeightedEntry {
    /// Creates a pool entry.
    #[must_use]
    pub const fn new(enemy: EnemyId, weight: Weight) -> Self {
        Self { enemy, weight }
    }

    /// Creates a pool entry from raw parts, rejecting zero weights.
    pub fn try_from_parts(
        enemy: impl Into<String>,
        weight: u32,
    ) -> Result<Self, ConfigurationError> {
        let enemy = EnemyId::new(enemy);
        match NonZeroU32::new(weight) {
            Some(weight) => Ok(Self::new(enemy, Weight::new(weight))),
            None => Err(ConfigurationError::ZeroWeight { enemy }),
        }
    }

    /// Enemy selected when this entry wins a draw.
    #[must_use]
    pub const fn enemy(&self) -> &EnemyId {
        &self.enemy
    }

    /// Relative weight of the entry.
    #[must_use]
    pub const fn weight(&self) -> Weight {
        self.weight
    }
}

/// Ordered sequence of weighted enemy entries.
///
/// Weights are relative within the pool and never normalised, so two pools
/// may use entirely different scales. Entry order is significant: draws walk
/// the pool front to back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedPool {
    entries: Vec<WeightedEntry>,
}

impl WeightedPool {
    /// Creates a pool from the provided entries.
    #[must_use]
    pub fn new(entries: Vec<WeightedEntry>) -> Self {
        Self { entries }
    }

    /// Creates an empty pool.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds a pool from `(enemy, weight)` pairs, rejecting zero weights.
    pub fn try_from_pairs<'a, I>(pairs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let entries = pairs
            .into_iter()
            .map(|(enemy, weight)| WeightedEntry::try_from_parts(enemy, weight))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(entries))
    }

    /// Entries of the pool in draw order.
    #[must_use]
    pub fn entries(&self) -> &[WeightedEntry] {
        &self.entries
    }

    /// Number of entries in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the pool has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every entry weight.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| u64::from(entry.weight.get()))
            .sum()
    }

    /// Reports whether any entry names the provided enemy.
    #[must_use]
    pub fn contains(&self, enemy: &EnemyId) -> bool {
        self.entries.iter().any(|entry| &entry.enemy == enemy)
    }
}

/// Hard ceiling on the share of a wave that may be ranged, stored in basis points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RangedFraction(u32);

impl RangedFraction {
    /// Fraction that forbids ranged spawns entirely.
    pub const ZERO: Self = Self(0);

    /// Creates a fraction from basis points, rejecting values above one.
    pub fn from_basis_points(points: u32) -> Result<Self, ConfigurationError> {
        if points > BASIS_POINTS_PER_UNIT {
            return Err(ConfigurationError::FractionOutOfRange(
                f64::from(points) / f64::from(BASIS_POINTS_PER_UNIT),
            ));
        }
        Ok(Self(points))
    }

    /// Creates a fraction from a ratio in `[0, 1]`, rounded to the nearest basis point.
    pub fn from_ratio(ratio: f64) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigurationError::FractionOutOfRange(ratio));
        }
        let points = (ratio * f64::from(BASIS_POINTS_PER_UNIT)).round() as u32;
        Ok(Self(points))
    }

    /// Fraction expressed in basis points.
    #[must_use]
    pub const fn basis_points(&self) -> u32 {
        self.0
    }

    /// Fraction expressed as a ratio.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        f64::from(self.0) / f64::from(BASIS_POINTS_PER_UNIT)
    }

    /// Reports whether the fraction forbids ranged spawns.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Largest ranged count permitted in a wave of `total` enemies, `floor(total × f)`.
    #[must_use]
    pub fn ceiling_for(&self, total: u32) -> u32 {
        let scaled = u64::from(total) * u64::from(self.0) / u64::from(BASIS_POINTS_PER_UNIT);
        scaled as u32
    }
}

impl TryFrom<f64> for RangedFraction {
    type Error = ConfigurationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_ratio(value)
    }
}

impl From<RangedFraction> for f64 {
    fn from(value: RangedFraction) -> Self {
        value.ratio()
    }
}

/// Weighted melee and ranged pools plus the ranged ceiling for one wave.
///
/// A zero `max_ranged_fraction` makes the ranged pool structurally
/// unreachable even when it holds entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveComposition {
    melee: WeightedPool,
    ranged: WeightedPool,
    max_ranged_fraction: RangedFraction,
}

impl WaveComposition {
    /// Creates a composition from its pools and ranged ceiling.
    #[must_use]
    pub const fn new(
        melee: WeightedPool,
        ranged: WeightedPool,
        max_ranged_fraction: RangedFraction,
    ) -> Self {
        Self {
            melee,
            ranged,
            max_ranged_fraction,
        }
    }

    /// Creates a composition that never spawns ranged enemies.
    #[must_use]
    pub const fn melee_only(melee: WeightedPool) -> Self {
        Self::new(melee, WeightedPool::empty(), RangedFraction::ZERO)
    }

    /// Pool drawn for melee spawns.
    #[must_use]
    pub const fn melee(&self) -> &WeightedPool {
        &self.melee
    }

    /// Pool drawn for ranged spawns.
    #[must_use]
    pub const fn ranged(&self) -> &WeightedPool {
        &self.ranged
    }

    /// Ceiling on the ranged share of the wave.
    #[must_use]
    pub const fn max_ranged_fraction(&self) -> RangedFraction {
        self.max_ranged_fraction
    }
}

/// One-based level index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelNumber(u32);

impl LevelNumber {
    /// Creates a new level index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric level.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LevelNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-based wave index within a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// Creates a new wave index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric wave.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for WaveNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spawn count and toughness configuration for a single level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelProfile {
    /// Number of waves fought before the level completes.
    pub waves: u32,
    /// Enemies spawned per wave in a single-player session.
    pub enemies_per_wave: u32,
    /// HP multiplier applied to every enemy of the level.
    pub hp_multiplier: f32,
}

impl LevelProfile {
    /// Creates a new level profile.
    #[must_use]
    pub const fn new(waves: u32, enemies_per_wave: u32, hp_multiplier: f32) -> Self {
        Self {
            waves,
            enemies_per_wave,
            hp_multiplier,
        }
    }

    /// Enemy count for a wave, growing by a quarter per extra player.
    #[must_use]
    pub fn enemies_for(&self, players: NonZeroU32) -> u32 {
        let extra = f64::from(players.get() - 1);
        let scaled = f64::from(self.enemies_per_wave) * (1.0 + extra * 0.25);
        scaled.round() as u32
    }

    /// HP multiplier for a wave, growing by half per extra player.
    #[must_use]
    pub fn hp_multiplier_for(&self, players: NonZeroU32) -> f32 {
        let extra = (players.get() - 1) as f32;
        self.hp_multiplier * (1.0 + extra * 0.5)
    }
}

/// Enemy roster drawn for a single wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WavePlan {
    /// Level the wave belongs to.
    pub level: LevelNumber,
    /// Wave index within the level.
    pub wave: WaveNumber,
    /// HP multiplier applied to every spawned enemy.
    pub hp_multiplier: f32,
    /// Indicates whether clearing this wave completes the level.
    pub is_final_wave: bool,
    /// Melee enemies in spawn order.
    pub melee: Vec<EnemyId>,
    /// Ranged enemies in spawn order.
    pub ranged: Vec<EnemyId>,
}

impl WavePlan {
    /// Total number of enemies in the wave.
    #[must_use]
    pub fn total(&self) -> usize {
        self.melee.len() + self.ranged.len()
    }
}

/// Reward deltas gathered by gameplay but not yet committed.
///
/// Counters are unsigned so negative deltas cannot be represented; deposits
/// saturate rather than wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEconomy {
    coins: u64,
    xp: u64,
}

impl PendingEconomy {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { coins: 0, xp: 0 }
    }

    /// Pending coin delta.
    #[must_use]
    pub const fn coins(&self) -> u64 {
        self.coins
    }

    /// Pending experience delta.
    #[must_use]
    pub const fn xp(&self) -> u64 {
        self.xp
    }

    /// Reports whether nothing is waiting to be committed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.coins == 0 && self.xp == 0
    }

    /// Banks coins into the buffer.
    pub fn deposit_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    /// Banks experience into the buffer.
    pub fn deposit_xp(&mut self, amount: u64) {
        self.xp = self.xp.saturating_add(amount);
    }

    /// Drains the pending coins, leaving zero behind.
    pub fn take_coins(&mut self) -> u64 {
        std::mem::take(&mut self.coins)
    }

    /// Drains the pending experience, leaving zero behind.
    pub fn take_xp(&mut self) -> u64 {
        std::mem::take(&mut self.xp)
    }
}

/// Persisted player progression: coins, experience and level.
///
/// Invariant: `xp < max_xp` and `max_xp > 0` at every observable point.
/// Deserialisation goes through [`PersistedProgress::new`], so stored records
/// that break the invariant are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredProgress")]
pub struct PersistedProgress {
    coins: u64,
    xp: u64,
    max_xp: u64,
    level: u32,
    high_stage: u32,
}

/// Unvalidated mirror of [`PersistedProgress`] as written to disk.
#[derive(Deserialize)]
struct StoredProgress {
    coins: u64,
    xp: u64,
    max_xp: u64,
    level: u32,
    #[serde(default = "first_stage")]
    high_stage: u32,
}

impl TryFrom<StoredProgress> for PersistedProgress {
    type Error = ConfigurationError;

    fn try_from(stored: StoredProgress) -> Result<Self, Self::Error> {
        Ok(Self::new(stored.coins, stored.xp, stored.max_xp, stored.level)?
            .with_high_stage(stored.high_stage))
    }
}

const fn first_stage() -> u32 {
    1
}

impl PersistedProgress {
    /// Creates a progress record, validating the experience invariant.
    ///
    /// A `level` of zero is raised to one.
    pub fn new(coins: u64, xp: u64, max_xp: u64, level: u32) -> Result<Self, ConfigurationError> {
        if max_xp == 0 {
            return Err(ConfigurationError::ZeroMaxXp);
        }
        if xp >= max_xp {
            return Err(ConfigurationError::XpAboveThreshold { xp, max_xp });
        }
        Ok(Self {
            coins,
            xp,
            max_xp,
            level: level.max(1),
            high_stage: first_stage(),
        })
    }

    /// Replaces the highest unlocked stage, raising zero to one.
    #[must_use]
    pub fn with_high_stage(mut self, stage: u32) -> Self {
        self.high_stage = stage.max(1);
        self
    }

    /// Progress of a brand new profile.
    #[must_use]
    pub const fn starting() -> Self {
        Self {
            coins: 0,
            xp: 0,
            max_xp: STARTING_MAX_XP,
            level: 1,
            high_stage: first_stage(),
        }
    }

    /// Persisted coin total.
    #[must_use]
    pub const fn coins(&self) -> u64 {
        self.coins
    }

    /// Experience accumulated toward the next level.
    #[must_use]
    pub const fn xp(&self) -> u64 {
        self.xp
    }

    /// Experience required to reach the next level.
    #[must_use]
    pub const fn max_xp(&self) -> u64 {
        self.max_xp
    }

    /// Current player level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Highest stage the player may start from.
    #[must_use]
    pub const fn high_stage(&self) -> u32 {
        self.high_stage
    }

    /// Unlocks the stage after `cleared` if it advances the record.
    ///
    /// Returns the newly unlocked stage, or `None` when an earlier stage was replayed.
    pub fn unlock_after(&mut self, cleared: u32) -> Option<u32> {
        if cleared < self.high_stage {
            return None;
        }
        self.high_stage = cleared.saturating_add(1);
        Some(self.high_stage)
    }

    /// Adds coins and returns the new total.
    pub fn add_coins(&mut self, amount: u64) -> u64 {
        self.coins = self.coins.saturating_add(amount);
        self.coins
    }

    /// Stores an experience value that stays below the current threshold.
    pub fn commit_xp(&mut self, xp: u64) {
        debug_assert!(xp < self.max_xp, "committed xp must stay below max xp");
        self.xp = xp;
    }

    /// Advances one level, installs the next threshold and resets experience.
    pub fn level_up(&mut self, next_max_xp: u64) {
        debug_assert!(next_max_xp > 0, "max xp must stay positive");
        self.level = self.level.saturating_add(1);
        self.max_xp = next_max_xp.max(1);
        self.xp = 0;
    }
}

impl Default for PersistedProgress {
    fn default() -> Self {
        Self::starting()
    }
}

/// Partial save record handed to the external save collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePatch {
    /// Coin total to persist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<u64>,
    /// Highest stage unlocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_stage: Option<u32>,
}

impl SavePatch {
    /// Patch persisting only the coin total.
    #[must_use]
    pub const fn coins(total: u64) -> Self {
        Self {
            coins: Some(total),
            high_stage: None,
        }
    }

    /// Patch persisting only the highest unlocked stage.
    #[must_use]
    pub const fn high_stage(stage: u32) -> Self {
        Self {
            coins: None,
            high_stage: Some(stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::{
        ConfigurationError, LevelProfile, PendingEconomy, PersistedProgress, RangedFraction,
        SavePatch, WeightedPool,
    };

    fn players(count: u32) -> NonZeroU32 {
        NonZeroU32::new(count).expect("non-zero players")
    }

    #[test]
    fn ranged_ceiling_floors_the_product() {
        let fraction = RangedFraction::from_ratio(0.35).expect("valid fraction");
        assert_eq!(fraction.ceiling_for(20), 7);
        assert_eq!(fraction.ceiling_for(17), 5);
        assert_eq!(RangedFraction::from_ratio(0.1).expect("valid").ceiling_for(8), 0);
        assert_eq!(RangedFraction::ZERO.ceiling_for(1_000), 0);
    }

    #[test]
    fn ranged_fraction_rejects_out_of_range_ratios() {
        assert_eq!(
            RangedFraction::from_ratio(1.5),
            Err(ConfigurationError::FractionOutOfRange(1.5))
        );
        assert!(RangedFraction::from_ratio(-0.1).is_err());
        assert!(RangedFraction::from_ratio(f64::NAN).is_err());
        assert!(RangedFraction::from_basis_points(10_001).is_err());
        assert_eq!(
            RangedFraction::from_ratio(1.0).expect("one").ceiling_for(9),
            9
        );
    }

    #[test]
    fn ranged_fraction_deserialises_from_ratio() {
        let fraction: RangedFraction = serde_json::from_str("0.25").expect("deserialise");
        assert_eq!(fraction.basis_points(), 2_500);
        assert!(serde_json::from_str::<RangedFraction>("2.0").is_err());
    }

    #[test]
    fn zero_weights_are_rejected() {
        let error = WeightedPool::try_from_pairs([("orc", 2), ("slime", 0)])
            .expect_err("zero weight must fail");
        assert!(matches!(error, ConfigurationError::ZeroWeight { enemy } if enemy.as_str() == "slime"));
    }

    #[test]
    fn total_weight_sums_entries() {
        let pool = WeightedPool::try_from_pairs([("orc", 2), ("slime", 1)]).expect("pool");
        assert_eq!(pool.total_weight(), 3);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn pending_take_leaves_zero_behind() {
        let mut pending = PendingEconomy::new();
        pending.deposit_coins(4);
        pending.deposit_xp(u64::MAX);
        pending.deposit_xp(10);
        assert_eq!(pending.xp(), u64::MAX, "deposits saturate");
        assert_eq!(pending.take_coins(), 4);
        assert_eq!(pending.coins(), 0);
        let _ = pending.take_xp();
        assert!(pending.is_empty());
    }

    #[test]
    fn progress_validation_enforces_threshold() {
        assert_eq!(
            PersistedProgress::new(0, 0, 0, 1),
            Err(ConfigurationError::ZeroMaxXp)
        );
        assert_eq!(
            PersistedProgress::new(0, 100, 100, 1),
            Err(ConfigurationError::XpAboveThreshold {
                xp: 100,
                max_xp: 100
            })
        );
        let progress = PersistedProgress::new(5, 10, 100, 0).expect("valid progress");
        assert_eq!(progress.level(), 1, "level zero is raised to one");
        assert_eq!(progress.high_stage(), 1);
    }

    #[test]
    fn replayed_stages_do_not_unlock() {
        let mut progress = PersistedProgress::starting().with_high_stage(4);
        assert_eq!(progress.unlock_after(2), None);
        assert_eq!(progress.unlock_after(4), Some(5));
        assert_eq!(progress.high_stage(), 5);
    }

    #[test]
    fn progress_without_high_stage_deserialises_to_first_stage() {
        let json = r#"{"coins":12,"xp":3,"max_xp":100,"level":2}"#;
        let progress: PersistedProgress = serde_json::from_str(json).expect("deserialise");
        assert_eq!(progress.high_stage(), 1);
        assert_eq!(progress.coins(), 12);
    }

    #[test]
    fn stored_progress_breaking_the_threshold_is_rejected() {
        let zero_threshold = r#"{"coins":0,"xp":500,"max_xp":0,"level":0}"#;
        assert!(serde_json::from_str::<PersistedProgress>(zero_threshold).is_err());

        let above_threshold = r#"{"coins":0,"xp":120,"max_xp":100,"level":3}"#;
        assert!(serde_json::from_str::<PersistedProgress>(above_threshold).is_err());

        let level_zero = r#"{"coins":0,"xp":0,"max_xp":100,"level":0,"high_stage":0}"#;
        let progress: PersistedProgress = serde_json::from_str(level_zero).expect("deserialise");
        assert_eq!(progress.level(), 1);
        assert_eq!(progress.high_stage(), 1);
    }

    #[test]
    fn progress_survives_a_json_round_trip() {
        let progress = PersistedProgress::new(40, 99, 144, 3)
            .expect("valid progress")
            .with_high_stage(4);
        let json = serde_json::to_string(&progress).expect("serialise");
        let restored: PersistedProgress = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(restored, progress);
    }

    #[test]
    fn level_profile_scales_with_players() {
        let profile = LevelProfile::new(3, 8, 1.2);
        assert_eq!(profile.enemies_for(players(1)), 8);
        assert_eq!(profile.enemies_for(players(2)), 10);
        assert_eq!(profile.enemies_for(players(3)), 12);
        assert!((profile.hp_multiplier_for(players(3)) - 2.4).abs() < 1e-5);
    }

    #[test]
    fn save_patch_omits_absent_fields() {
        let json = serde_json::to_string(&SavePatch::coins(30)).expect("serialise");
        assert_eq!(json, r#"{"coins":30}"#);
    }
}
