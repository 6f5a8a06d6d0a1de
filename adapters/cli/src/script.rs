//! Scripted economy frames replayed through the reconciler.

use std::{str::FromStr, time::Duration};

use anyhow::{bail, Context, Error, Result};
use warband_core::{Command, Event, LevelNumber, SessionState};

/// One frame of an economy script, written as `kind` or `kind:value`.
///
/// Accepted forms: `coins:N`, `xp:N`, `tick:MS`, `pause`, `resume`, `flush`
/// and `clear:STAGE`. Several steps joined with `+` share one frame. Within a
/// frame the economy applies ticks and session changes before awards and
/// flushes, so `pause` or `resume` cannot share a frame with `flush`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScriptStep {
    /// Banks coins.
    Coins(u64),
    /// Banks experience.
    Xp(u64),
    /// Advances simulated time.
    Tick(Duration),
    Pause,
    Resume,
    /// Requests an immediate flush.
    Flush,
    /// Records a cleared stage.
    Clear(u32),
}

impl ScriptStep {
    fn apply(self, events: &mut Vec<Event>, commands: &mut Vec<Command>) {
        match self {
            Self::Coins(amount) => commands.push(Command::AwardCoins { amount }),
            Self::Xp(amount) => commands.push(Command::AwardXp { amount }),
            Self::Tick(dt) => events.push(Event::TimeAdvanced { dt }),
            Self::Pause => events.push(Event::SessionStateChanged {
                state: SessionState::Paused,
            }),
            Self::Resume => events.push(Event::SessionStateChanged {
                state: SessionState::Active,
            }),
            Self::Flush => commands.push(Command::FlushEconomy),
            Self::Clear(stage) => commands.push(Command::RecordStageCleared {
                stage: LevelNumber::new(stage),
            }),
        }
    }
}

impl FromStr for ScriptStep {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let (kind, argument) = match value.trim().split_once(':') {
            Some((kind, argument)) => (kind, Some(argument)),
            None => (value.trim(), None),
        };
        let number = |name: &str| -> Result<u64> {
            let Some(argument) = argument else {
                bail!("`{name}` requires a value, for example `{name}:10`");
            };
            argument
                .parse()
                .with_context(|| format!("invalid value `{argument}` for `{name}`"))
        };

        let step = match kind {
            "coins" => Self::Coins(number(kind)?),
            "xp" => Self::Xp(number(kind)?),
            "tick" => Self::Tick(Duration::from_millis(number(kind)?)),
            "clear" => {
                let stage = number(kind)?;
                Self::Clear(u32::try_from(stage).context("stage does not fit in 32 bits")?)
            }
            "pause" | "resume" | "flush" if argument.is_some() => {
                bail!("`{kind}` does not take a value")
            }
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "flush" => Self::Flush,
            other => bail!("unknown script step `{other}`"),
        };
        Ok(step)
    }
}

/// Inputs delivered to the economy in a single frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Frame {
    pub(crate) events: Vec<Event>,
    pub(crate) commands: Vec<Command>,
}

impl FromStr for Frame {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let mut frame = Self::default();
        let mut session_change = false;
        let mut flush = false;
        for step in value.split('+') {
            let step: ScriptStep = step
                .parse()
                .with_context(|| format!("invalid frame `{value}`"))?;
            match step {
                ScriptStep::Pause | ScriptStep::Resume => session_change = true,
                ScriptStep::Flush => flush = true,
                _ => {}
            }
            step.apply(&mut frame.events, &mut frame.commands);
        }
        if session_change && flush {
            bail!("frame `{value}` mixes a session change with `flush`; split it into two frames");
        }
        Ok(frame)
    }
}
