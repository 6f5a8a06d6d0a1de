//! Weighted draws and the melee/ranged spawn split.

use rand::Rng;
use tracing::debug;
use warband_core::{ConfigurationError, EnemyId, WaveComposition, WeightedPool};

/// Draws one enemy from the pool using the provided random stream.
///
/// Fails with [`ConfigurationError::EmptyPool`] when the pool has no entries;
/// an empty pool is a misconfigured composition and is never tolerated.
pub fn weighted_pick<'pool, R>(
    pool: &'pool WeightedPool,
    rng: &mut R,
) -> Result<&'pool EnemyId, ConfigurationError>
where
    R: Rng + ?Sized,
{
    if pool.is_empty() {
        return Err(ConfigurationError::EmptyPool);
    }
    select(pool, rng.gen::<f64>())
}

/// Selects the entry hit by a unit draw in `[0, 1)`.
///
/// The draw is scaled to `[0, total_weight)` and the pool is walked in order,
/// subtracting each weight until the remainder reaches zero or below. If the
/// walk exhausts every entry without getting there, the last entry wins.
pub fn select(pool: &WeightedPool, unit: f64) -> Result<&EnemyId, ConfigurationError> {
    let Some(last) = pool.entries().last() else {
        return Err(ConfigurationError::EmptyPool);
    };

    let mut remainder = unit * pool.total_weight() as f64;
    for entry in pool.entries() {
        remainder -= f64::from(entry.weight().get());
        if remainder <= 0.0 {
            return Ok(entry.enemy());
        }
    }

    debug!(unit, remainder, "weighted walk exhausted pool; using last entry");
    Ok(last.enemy())
}

/// Melee and ranged spawn counts for a single wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpawnSplit {
    /// Number of melee spawns.
    pub melee: u32,
    /// Number of ranged spawns.
    pub ranged: u32,
}

/// Splits a wave of `total` enemies according to the composition's ranged ceiling.
///
/// The ranged share is `floor(total × max_ranged_fraction)`, dropping to zero
/// whenever the fraction is zero or the ranged pool is empty. The rest is melee.
#[must_use]
pub fn split_wave(total: u32, composition: &WaveComposition) -> SpawnSplit {
    let fraction = composition.max_ranged_fraction();
    let ranged = if fraction.is_zero() || composition.ranged().is_empty() {
        0
    } else {
        fraction.ceiling_for(total)
    };

    SpawnSplit {
        melee: total - ranged,
        ranged,
    }
}

/// Draws `count` enemies from `pool`, one independent pick each.
pub fn draw_many<R>(
    pool: &WeightedPool,
    count: u32,
    rng: &mut R,
) -> Result<Vec<EnemyId>, ConfigurationError>
where
    R: Rng + ?Sized,
{
    (0..count)
        .map(|_| weighted_pick(pool, rng).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use warband_core::RangedFraction;

    fn pool() -> WeightedPool {
        WeightedPool::try_from_pairs([("a", 2), ("b", 1)]).expect("pool")
    }

    #[test]
    fn zero_draw_selects_first_entry() {
        let pool = pool();
        let mut rng = StepRng::new(0, 0);
        assert_eq!(weighted_pick(&pool, &mut rng).expect("pick").as_str(), "a");
    }

    #[test]
    fn highest_draw_selects_last_entry() {
        let pool = pool();
        let mut rng = StepRng::new(u64::MAX, 0);
        assert_eq!(weighted_pick(&pool, &mut rng).expect("pick").as_str(), "b");
    }

    #[test]
    fn nan_draw_falls_back_to_last_entry() {
        assert_eq!(select(&pool(), f64::NAN).expect("pick").as_str(), "b");
    }

    #[test]
    fn split_respects_ceiling() {
        let composition = WaveComposition::new(
            WeightedPool::try_from_pairs([("orc", 1)]).expect("melee"),
            WeightedPool::try_from_pairs([("wizard", 1)]).expect("ranged"),
            RangedFraction::from_ratio(0.2).expect("fraction"),
        );
        assert_eq!(
            split_wave(11, &composition),
            SpawnSplit {
                melee: 9,
                ranged: 2
            }
        );
        assert_eq!(
            split_wave(4, &composition),
            SpawnSplit {
                melee: 4,
                ranged: 0
            }
        );
    }

    #[test]
    fn empty_ranged_pool_forces_melee() {
        let composition = WaveComposition::new(
            WeightedPool::try_from_pairs([("orc", 1)]).expect("melee"),
            WeightedPool::empty(),
            RangedFraction::from_ratio(0.5).expect("fraction"),
        );
        assert_eq!(split_wave(10, &composition).ranged, 0);
    }

    #[test]
    fn draw_many_propagates_empty_pool() {
        let mut rng = StepRng::new(0, 1);
        assert_eq!(
            draw_many(&WeightedPool::empty(), 3, &mut rng),
            Err(ConfigurationError::EmptyPool)
        );
        assert_eq!(
            draw_many(&WeightedPool::empty(), 0, &mut rng),
            Ok(Vec::new()),
            "no draws means the pool is never consulted"
        );
    }
}
