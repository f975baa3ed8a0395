//! Behavior tree simulation binary.
//!
//! Ticks a squad of guards through one compiled guard tree for a fixed number
//! of rounds. Every few rounds the squad alarm is raised: all guards are
//! aborted out of whatever they were doing and re-evaluated from the top.
//!
//! # Examples
//!
//! ```bash
//! BT_SIM_AGENTS=8 BT_SIM_SEED=7 RUST_LOG=bt_sim=debug cargo run -p bt-sim
//! ```
mod config;
mod guard;

use std::sync::Arc;

use anyhow::{Context, Result};
use behavior_tree::{Blackboard, BoardRegistry, Status, Tree};

use config::SimConfig;
use guard::{ALARM, GuardId, SQUAD, World};

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SimConfig::from_env();
    tracing::info!(?config, "starting simulation");

    let squad = BoardRegistry::new();
    let mut board = Blackboard::new();
    board.set(ALARM, false);
    squad
        .register(SQUAD, board)
        .context("failed to register squad board")?;

    let patrol = Tree::builder(&guard::patrol())
        .config(config.tree())
        .build()
        .context("failed to compile patrol tree")?;
    let tree = Tree::builder(&guard::guard(Arc::new(patrol)))
        .config(config.tree())
        .boards(squad.clone())
        .build()
        .context("failed to compile guard tree")?;
    tracing::debug!("guard program:\n{}", tree.program());

    let mut world = World { round: 0, squad };
    let mut tally = Tally::default();

    for round in 0..config.ticks {
        world.round = round;

        if config.alarm_at(round) {
            world
                .squad
                .update(SQUAD, |board| board.set(ALARM, true))
                .context("failed to raise alarm")?;
            for guard in 0..config.agents {
                tree.abort(&guard, &mut world);
            }
            tracing::info!(round, "alarm raised");
        }

        for guard in 0..config.agents {
            let status = tick(&tree, guard, &mut world)?;
            tally.record(status);
        }
    }

    tracing::info!(
        rounds = config.ticks,
        guards = config.agents,
        succeeded = tally.succeeded,
        failed = tally.failed,
        running = tally.running,
        "simulation finished"
    );
    Ok(())
}

fn tick(tree: &Tree<GuardId, World>, guard: GuardId, world: &mut World) -> Result<Status> {
    tree.run(&guard, world)
        .with_context(|| format!("guard {guard} failed in round {}", world.round))
}

/// Outcome counts across every tick of the run.
#[derive(Debug, Default)]
struct Tally {
    succeeded: u64,
    failed: u64,
    running: u64,
}

impl Tally {
    fn record(&mut self, status: Status) {
        match status {
            Status::Success => self.succeeded += 1,
            Status::Failure => self.failed += 1,
            Status::Running => self.running += 1,
        }
    }
}
