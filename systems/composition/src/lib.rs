#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave composition resolver and planner.
//!
//! Given a `(level, wave)` pair the resolver returns the weighted melee and
//! ranged pools for that wave, falling back gracefully when the pair is not
//! configured. The planner combines a resolved composition with the level
//! roster to draw a concrete enemy list from a single sequential random stream.

mod pick;
mod roster;
mod table;

use std::num::NonZeroU32;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use warband_core::{Command, ConfigurationError, Event, LevelNumber, WaveNumber, WavePlan};

pub use pick::{draw_many, select, split_wave, weighted_pick, SpawnSplit};
pub use roster::LevelRoster;
pub use table::CompositionTable;

/// Draws the enemy roster for a wave.
///
/// The wave size comes from the level roster scaled by player count, the split
/// honours the composition's ranged ceiling, and every spawn is an independent
/// draw from `rng`.
pub fn plan_wave<R>(
    table: &CompositionTable,
    roster: &LevelRoster,
    level: LevelNumber,
    wave: WaveNumber,
    players: NonZeroU32,
    rng: &mut R,
) -> Result<WavePlan, ConfigurationError>
where
    R: Rng + ?Sized,
{
    let profile = roster.profile(level);
    let composition = table.resolve(level, wave);
    let total = profile.enemies_for(players);
    let split = split_wave(total, composition);

    let melee = draw_many(composition.melee(), split.melee, rng)?;
    let ranged = draw_many(composition.ranged(), split.ranged, rng)?;

    debug!(
        %level,
        %wave,
        melee = split.melee,
        ranged = split.ranged,
        "planned wave"
    );

    Ok(WavePlan {
        level,
        wave,
        hp_multiplier: profile.hp_multiplier_for(players),
        is_final_wave: wave.get() >= profile.waves,
        melee,
        ranged,
    })
}

/// Pure system that answers [`Command::PlanWave`] with [`Event::WavePlanned`].
///
/// The planner owns one random stream seeded at construction; it is never
/// reseeded, so consecutive waves draw independently.
#[derive(Debug)]
pub struct WavePlanner {
    table: CompositionTable,
    roster: LevelRoster,
    rng: ChaCha8Rng,
}

impl WavePlanner {
    /// Creates a planner over the provided configuration.
    #[must_use]
    pub fn new(table: CompositionTable, roster: LevelRoster, seed: u64) -> Self {
        Self {
            table,
            roster,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Composition table consulted by the planner.
    #[must_use]
    pub fn table(&self) -> &CompositionTable {
        &self.table
    }

    /// Level roster consulted by the planner.
    #[must_use]
    pub fn roster(&self) -> &LevelRoster {
        &self.roster
    }

    /// Consumes plan requests and emits one planned wave per request.
    ///
    /// Stops at the first misconfigured composition; plans emitted before the
    /// failure remain in `out`.
    pub fn handle(
        &mut self,
        commands: &[Command],
        out: &mut Vec<Event>,
    ) -> Result<(), ConfigurationError> {
        for command in commands {
            if let Command::PlanWave {
                level,
                wave,
                players,
            } = command
            {
                let plan = plan_wave(
                    &self.table,
                    &self.roster,
                    *level,
                    *wave,
                    *players,
                    &mut self.rng,
                )?;
                out.push(Event::WavePlanned { plan });
            }
        }
        Ok(())
    }
}
