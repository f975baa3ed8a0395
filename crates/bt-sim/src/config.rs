//! Simulation settings read from the environment.
use std::env;

use behavior_tree::TreeConfig;

/// Simulation configuration.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Number of guards ticked every round.
    pub agents: u32,
    /// Number of rounds to simulate.
    pub ticks: u32,
    /// Seed for patrol route selection; `None` draws from system entropy.
    pub seed: Option<u64>,
    /// Instruction budget per tick.
    pub step_limit: Option<usize>,
    /// Raise the squad alarm every this many rounds (0 disables it).
    pub alarm_every: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            agents: 4,
            ticks: 24,
            seed: None,
            step_limit: Some(1024),
            alarm_every: 9,
        }
    }
}

impl SimConfig {
    /// Construct simulation configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BT_SIM_AGENTS` - Number of guards (default: 4)
    /// - `BT_SIM_TICKS` - Number of rounds (default: 24)
    /// - `BT_SIM_SEED` - Random seed (default: unseeded)
    /// - `BT_SIM_STEP_LIMIT` - Instructions per tick, 0 for unlimited (default: 1024)
    /// - `BT_SIM_ALARM_EVERY` - Alarm period in rounds, 0 to disable (default: 9)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(agents) = read_env::<u32>("BT_SIM_AGENTS") {
            config.agents = agents.max(1);
        }
        if let Some(ticks) = read_env::<u32>("BT_SIM_TICKS") {
            config.ticks = ticks;
        }
        if let Some(seed) = read_env::<u64>("BT_SIM_SEED") {
            config.seed = Some(seed);
        }
        if let Some(limit) = read_env::<usize>("BT_SIM_STEP_LIMIT") {
            config.step_limit = (limit > 0).then_some(limit);
        }
        if let Some(period) = read_env::<u32>("BT_SIM_ALARM_EVERY") {
            config.alarm_every = period;
        }

        config
    }

    /// Settings shared by every tree the simulation builds.
    pub fn tree(&self) -> TreeConfig {
        TreeConfig {
            seed: self.seed,
            step_limit: self.step_limit,
        }
    }

    /// Returns `true` if the alarm goes off at the start of `round`.
    pub fn alarm_at(&self, round: u32) -> bool {
        self.alarm_every > 0 && round > 0 && round % self.alarm_every == 0
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
