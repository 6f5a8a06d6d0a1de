#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plans waves and replays economy scripts.

mod campaign;
mod script;

use std::{
    fs,
    io::{self, Write},
    num::NonZeroU32,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use warband_core::{
    Command, EnemyId, Event, LevelNumber, PersistedProgress, WaveNumber, WavePlan,
};
use warband_system_composition::WavePlanner;
use warband_system_economy::{Economy, FlushCadence, FlushConfig, RecordingSink};

use crate::{campaign::Campaign, script::Frame};

/// Progression director tooling.
#[derive(Debug, Parser)]
#[command(name = "warband", version, about)]
struct Cli {
    /// Campaign TOML file; the built-in campaign is used when omitted.
    #[arg(long, global = true)]
    campaign: Option<PathBuf>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Draws enemy rosters for one wave or every wave of a level.
    Plan(PlanArgs),
    /// Replays scripted frames through the economy reconciler.
    Economy(EconomyArgs),
}

#[derive(Debug, clap::Args)]
struct PlanArgs {
    /// One-based level number.
    #[arg(long, default_value_t = 1)]
    level: u32,
    /// One-based wave number; plans every wave of the level when omitted.
    #[arg(long)]
    wave: Option<u32>,
    /// Players in the session.
    #[arg(long, default_value = "1")]
    players: NonZeroU32,
    /// Seed for the planner's random stream.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Prints each plan as a JSON line.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
struct EconomyArgs {
    /// JSON file holding the starting progress; a new profile when omitted.
    #[arg(long)]
    progress: Option<PathBuf>,
    /// Flush interval in milliseconds.
    #[arg(long, default_value_t = 50)]
    interval_ms: u64,
    /// Frames such as `coins:5`, `tick:50+xp:120` or `pause`.
    #[arg(required = true)]
    frames: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let campaign = Campaign::load(cli.campaign.as_deref())?;
    let mut stdout = io::stdout().lock();
    match cli.mode {
        Mode::Plan(args) => run_plan(campaign, &args, &mut stdout),
        Mode::Economy(args) => {
            let progress = match args.progress.as_deref() {
                Some(path) => load_progress(path)?,
                None => PersistedProgress::starting(),
            };
            let frames = args
                .frames
                .iter()
                .map(|frame| frame.parse())
                .collect::<Result<Vec<Frame>>>()?;
            let cadence = FlushCadence::new(std::time::Duration::from_millis(args.interval_ms));
            let _ = run_economy(progress, cadence, &frames, &mut stdout)?;
            Ok(())
        }
    }
}

fn run_plan(campaign: Campaign, args: &PlanArgs, out: &mut impl Write) -> Result<()> {
    if args.level == 0 {
        bail!("levels are numbered from 1");
    }
    let level = LevelNumber::new(args.level);
    let waves = campaign.roster.profile(level).waves;
    let requested = match args.wave {
        Some(0) => bail!("waves are numbered from 1"),
        Some(wave) => wave..=wave,
        None => 1..=waves,
    };

    let commands: Vec<Command> = requested
        .map(|wave| Command::PlanWave {
            level,
            wave: WaveNumber::new(wave),
            players: args.players,
        })
        .collect();

    let mut planner = WavePlanner::new(campaign.table, campaign.roster, args.seed);
    let mut events = Vec::with_capacity(commands.len());
    planner
        .handle(&commands, &mut events)
        .context("campaign composition cannot be planned")?;
    info!(level = args.level, waves = events.len(), "planned level");

    for event in events {
        if let Event::WavePlanned { plan } = event {
            if args.json {
                writeln!(out, "{}", serde_json::to_string(&plan)?)?;
            } else {
                write_plan(&plan, out)?;
            }
        }
    }
    Ok(())
}

fn write_plan(plan: &WavePlan, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "level {} wave {}{}: {} enemies, hp x{:.2}",
        plan.level,
        plan.wave,
        if plan.is_final_wave { " (final)" } else { "" },
        plan.total(),
        plan.hp_multiplier,
    )?;
    writeln!(out, "  melee:  [{}]", enemy_list(&plan.melee))?;
    writeln!(out, "  ranged: [{}]", enemy_list(&plan.ranged))?;
    Ok(())
}

fn enemy_list(enemies: &[EnemyId]) -> String {
    enemies
        .iter()
        .map(EnemyId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn load_progress(path: &Path) -> Result<PersistedProgress> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read progress file at {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid progress file at {}", path.display()))
}

fn run_economy(
    mut progress: PersistedProgress,
    cadence: FlushCadence,
    frames: &[Frame],
    out: &mut impl Write,
) -> Result<PersistedProgress> {
    let mut economy = Economy::new(FlushConfig::default(), cadence);
    let mut sink = RecordingSink::new();
    let mut events = Vec::new();

    for (index, frame) in frames.iter().enumerate() {
        let _ = economy.handle(
            &frame.events,
            &frame.commands,
            &mut progress,
            &mut sink,
            &mut events,
        );
        for event in events.drain(..) {
            match event {
                Event::CoinsCommitted { total } => writeln!(out, "[{index}] coins {total}")?,
                Event::XpCommitted { xp, max_xp } => {
                    writeln!(out, "[{index}] xp {xp}/{max_xp}")?;
                }
                Event::LeveledUp { level, max_xp } => {
                    writeln!(out, "[{index}] level up to {level}, next at {max_xp} xp")?;
                }
                _ => {}
            }
        }
        for patch in sink.take() {
            writeln!(out, "[{index}] save {}", serde_json::to_string(&patch)?)?;
        }
    }

    let pending = economy.pending();
    writeln!(out, "progress {}", serde_json::to_string(&progress)?)?;
    writeln!(out, "pending coins={} xp={}", pending.coins(), pending.xp())?;
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn frames(raw: &[&str]) -> Vec<Frame> {
        raw.iter().map(|frame| frame.parse().expect("frame")).collect()
    }

    fn replay(raw: &[&str]) -> (PersistedProgress, String) {
        let mut out = Vec::new();
        let progress = run_economy(
            PersistedProgress::starting(),
            FlushCadence::new(Duration::from_millis(50)),
            &frames(raw),
            &mut out,
        )
        .expect("replay");
        (progress, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn economy_replay_reports_saves_and_level_ups() {
        let (progress, output) = replay(&[
            "coins:5+xp:250+flush",
            "coins:5+flush",
            "flush",
            "flush",
        ]);

        assert_eq!(progress.coins(), 10);
        assert_eq!(progress.level(), 3);
        assert_eq!(progress.xp(), 30);
        assert!(output.contains("[0] coins 5"));
        assert!(output.contains("[0] level up to 2, next at 120 xp"));
        assert!(output.contains("[1] save {\"coins\":10}"));
        assert!(output.contains("[1] level up to 3, next at 144 xp"));
        assert!(output.contains("[2] xp 30/144"));
        assert!(!output.contains("[3]"), "nothing left to flush");
        assert!(output.ends_with("pending coins=0 xp=0\n"));
    }

    #[test]
    fn paused_frames_bank_without_committing() {
        let (progress, output) = replay(&["pause", "coins:7+tick:500+flush"]);

        assert_eq!(progress.coins(), 0);
        assert!(output.contains("pending coins=7 xp=0"));
    }

    #[test]
    fn plan_writes_every_wave_of_a_level() {
        let args = PlanArgs {
            level: 2,
            wave: None,
            players: NonZeroU32::new(1).expect("non-zero"),
            seed: 7,
            json: false,
        };
        let mut out = Vec::new();
        run_plan(Campaign::standard(), &args, &mut out).expect("plan");
        let output = String::from_utf8(out).expect("utf8");

        assert!(output.contains("level 2 wave 1: 8 enemies"));
        assert!(output.contains("level 2 wave 3 (final): 8 enemies"));
    }

    #[test]
    fn plan_json_lines_deserialize() {
        let args = PlanArgs {
            level: 5,
            wave: Some(3),
            players: NonZeroU32::new(2).expect("non-zero"),
            seed: 1,
            json: true,
        };
        let mut out = Vec::new();
        run_plan(Campaign::standard(), &args, &mut out).expect("plan");
        let output = String::from_utf8(out).expect("utf8");

        let plan: WavePlan = serde_json::from_str(output.trim()).expect("json plan");
        assert_eq!(plan.total(), 21);
        assert_eq!(plan.ranged.len(), 7);
    }

    #[test]
    fn plan_rejects_zero_indices() {
        let mut args = PlanArgs {
            level: 0,
            wave: None,
            players: NonZeroU32::new(1).expect("non-zero"),
            seed: 0,
            json: false,
        };
        assert!(run_plan(Campaign::standard(), &args, &mut Vec::new()).is_err());
        args.level = 1;
        args.wave = Some(0);
        assert!(run_plan(Campaign::standard(), &args, &mut Vec::new()).is_err());
    }
}
