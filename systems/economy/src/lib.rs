#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Economy flush reconciler that commits batched coin and XP gains.
//!
//! Gameplay banks rewards into a [`PendingEconomy`] buffer. A periodic flush
//! moves the buffer into [`PersistedProgress`]: coins commit immediately and
//! trigger a save on multiples of ten, while experience commits with at most
//! one level-up per flush. Experience beyond the threshold is re-banked and
//! consumed by later flushes, one level at a time.

mod cadence;

use std::num::NonZeroU64;

use tracing::{debug, info};
use warband_core::{
    Command, Event, PendingEconomy, PersistedProgress, SavePatch, SessionState,
};

pub use cadence::{FlushCadence, DEFAULT_FLUSH_INTERVAL};

const DEFAULT_SAVE_EVERY_COINS: NonZeroU64 = match NonZeroU64::new(10) {
    Some(step) => step,
    None => panic!("save step must be non-zero"),
};
const DEFAULT_GROWTH_DENOMINATOR: NonZeroU64 = match NonZeroU64::new(5) {
    Some(denominator) => denominator,
    None => panic!("growth denominator must be non-zero"),
};

/// External collaborator that persists partial saves.
///
/// Saves are fire-and-forget: the reconciler neither waits for completion nor
/// rolls back committed state when a save fails.
pub trait SaveSink {
    /// Persists the provided patch.
    fn save(&mut self, patch: SavePatch);
}

impl<F> SaveSink for F
where
    F: FnMut(SavePatch),
{
    fn save(&mut self, patch: SavePatch) {
        self(patch);
    }
}

/// Sink that keeps every patch it receives, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingSink {
    patches: Vec<SavePatch>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches received so far.
    #[must_use]
    pub fn patches(&self) -> &[SavePatch] {
        &self.patches
    }

    /// Drains the recorded patches.
    pub fn take(&mut self) -> Vec<SavePatch> {
        std::mem::take(&mut self.patches)
    }
}

impl SaveSink for RecordingSink {
    fn save(&mut self, patch: SavePatch) {
        self.patches.push(patch);
    }
}

/// Tuning for coin save throttling and level threshold growth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushConfig {
    save_every_coins: NonZeroU64,
    growth_numerator: u64,
    growth_denominator: NonZeroU64,
}

impl FlushConfig {
    /// Creates a configuration.
    ///
    /// Coin totals that are exact multiples of `save_every_coins` trigger a
    /// save. Each level-up multiplies the threshold by
    /// `growth_numerator / growth_denominator`, rounded down.
    #[must_use]
    pub const fn new(
        save_every_coins: NonZeroU64,
        growth_numerator: u64,
        growth_denominator: NonZeroU64,
    ) -> Self {
        Self {
            save_every_coins,
            growth_numerator,
            growth_denominator,
        }
    }

    /// Coin multiple that triggers a save.
    #[must_use]
    pub const fn save_every_coins(&self) -> u64 {
        self.save_every_coins.get()
    }

    /// Reports whether a coin total lands on a save boundary.
    #[must_use]
    pub const fn is_save_boundary(&self, coins: u64) -> bool {
        coins % self.save_every_coins.get() == 0
    }

    /// Threshold of the level after one with `max_xp`; never zero.
    #[must_use]
    pub fn next_max_xp(&self, max_xp: u64) -> u64 {
        let scaled = u128::from(max_xp) * u128::from(self.growth_numerator)
            / u128::from(self.growth_denominator.get());
        u64::try_from(scaled).unwrap_or(u64::MAX).max(1)
    }
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_EVERY_COINS, 6, DEFAULT_GROWTH_DENOMINATOR)
    }
}

/// Summary of what a single flush changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Coins were committed.
    pub coins_committed: bool,
    /// A coin save was handed to the sink.
    pub saved: bool,
    /// Experience was committed, with or without a level-up.
    pub xp_committed: bool,
    /// The flush performed its single level-up step.
    pub leveled_up: bool,
}

impl FlushOutcome {
    /// Reports whether the flush mutated anything.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        !self.coins_committed && !self.xp_committed
    }
}

/// Commits the pending buffer into persisted progress.
///
/// Does nothing while `session` is paused. Otherwise pending coins are added
/// to the total and a coin save is issued when the new total is a multiple of
/// the configured step. Pending experience is cleared before the threshold
/// check; when the combined value reaches the threshold the player gains
/// exactly one level, experience resets to zero and the excess is deposited
/// back into `pending` for the next flush.
pub fn flush<S>(
    config: &FlushConfig,
    session: SessionState,
    pending: &mut PendingEconomy,
    progress: &mut PersistedProgress,
    sink: &mut S,
    out: &mut Vec<Event>,
) -> FlushOutcome
where
    S: SaveSink + ?Sized,
{
    let mut outcome = FlushOutcome::default();
    if !session.is_active() {
        return outcome;
    }

    if pending.coins() > 0 {
        let gained = pending.take_coins();
        let total = progress.add_coins(gained);
        outcome.coins_committed = true;
        out.push(Event::CoinsCommitted { total });
        debug!(gained, total, "committed coins");

        if config.is_save_boundary(total) {
            info!(total, "saving coin total");
            sink.save(SavePatch::coins(total));
            outcome.saved = true;
        }
    }

    if pending.xp() > 0 {
        let gained = pending.take_xp();
        // `xp < max_xp`, so the headroom is positive and the excess is exact.
        let headroom = progress.max_xp() - progress.xp();
        outcome.xp_committed = true;

        if gained < headroom {
            let xp = progress.xp() + gained;
            progress.commit_xp(xp);
            out.push(Event::XpCommitted {
                xp,
                max_xp: progress.max_xp(),
            });
            debug!(xp, max_xp = progress.max_xp(), "committed xp");
        } else {
            let excess = gained - headroom;
            progress.level_up(config.next_max_xp(progress.max_xp()));
            pending.deposit_xp(excess);
            outcome.leveled_up = true;
            out.push(Event::LeveledUp {
                level: progress.level(),
                max_xp: progress.max_xp(),
            });
            info!(
                level = progress.level(),
                max_xp = progress.max_xp(),
                deferred = excess,
                "level up"
            );
        }
    }

    outcome
}

/// Records a cleared stage and saves the newly unlocked stage, if any.
///
/// Replaying a stage below the stored record changes nothing.
pub fn record_stage_cleared<S>(
    stage: u32,
    progress: &mut PersistedProgress,
    sink: &mut S,
) -> Option<u32>
where
    S: SaveSink + ?Sized,
{
    let unlocked = progress.unlock_after(stage)?;
    info!(stage, unlocked, "unlocked stage");
    sink.save(SavePatch::high_stage(unlocked));
    Some(unlocked)
}

/// Session-scoped system that owns the pending buffer and schedules flushes.
///
/// Award commands bank into the buffer regardless of the session state. A
/// flush runs when the cadence comes due or a [`Command::FlushEconomy`] is
/// received, at most once per [`Economy::handle`] call.
#[derive(Debug, Default)]
pub struct Economy {
    config: FlushConfig,
    cadence: FlushCadence,
    session: SessionState,
    pending: PendingEconomy,
}

impl Economy {
    /// Creates an active economy with the provided configuration and cadence.
    #[must_use]
    pub fn new(config: FlushConfig, cadence: FlushCadence) -> Self {
        Self {
            config,
            cadence,
            session: SessionState::Active,
            pending: PendingEconomy::new(),
        }
    }

    /// Gains banked but not yet committed.
    #[must_use]
    pub const fn pending(&self) -> &PendingEconomy {
        &self.pending
    }

    /// Current session state.
    #[must_use]
    pub const fn session(&self) -> SessionState {
        self.session
    }

    /// Consumes events and commands, flushing into `progress` when due.
    ///
    /// Every event is applied before any command, so a pause or resume in
    /// `events` governs a [`Command::FlushEconomy`] in the same batch.
    pub fn handle<S>(
        &mut self,
        events: &[Event],
        commands: &[Command],
        progress: &mut PersistedProgress,
        sink: &mut S,
        out: &mut Vec<Event>,
    ) -> FlushOutcome
    where
        S: SaveSink + ?Sized,
    {
        let mut flush_due = false;

        for event in events {
            match event {
                Event::SessionStateChanged { state } => {
                    self.session = *state;
                    if !state.is_active() {
                        self.cadence.reset();
                    }
                }
                Event::TimeAdvanced { dt } => {
                    if self.session.is_active() && self.cadence.advance(*dt) {
                        flush_due = true;
                    }
                }
                _ => {}
            }
        }

        for command in commands {
            match command {
                Command::AwardCoins { amount } => self.pending.deposit_coins(*amount),
                Command::AwardXp { amount } => self.pending.deposit_xp(*amount),
                Command::FlushEconomy => flush_due = true,
                Command::RecordStageCleared { stage } => {
                    let _ = record_stage_cleared(stage.get(), progress, sink);
                }
                Command::PlanWave { .. } => {}
            }
        }

        if !flush_due {
            return FlushOutcome::default();
        }

        flush(
            &self.config,
            self.session,
            &mut self.pending,
            progress,
            sink,
            out,
        )
    }
}
