//! Tree handle.
//!
//! A [`Tree`] owns one compiled [`Program`] and the execution state of every
//! agent ticked through it. Agents are identified by any comparable key `K`;
//! their state (cursor, suspension flag, blackboard, loop counters) is created
//! on the first [`Tree::run`] and lives until [`Tree::remove_agent`].
//!
//! # Reentrancy
//!
//! A tree ticks one agent at a time. A `run` issued while the same tree is
//! already ticking (for example a task that synchronously ticks the tree it
//! belongs to) is rejected with [`RunError::Reentrant`] and leaves every agent
//! untouched. Distinct trees, including sub-trees, are independent.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::behavior::TaskContext;
use crate::blackboard::{Blackboard, BoardRegistry};
use crate::compiler::compile;
use crate::config::TreeConfig;
use crate::error::{CompileResult, RunError, RunResult};
use crate::interpreter::{self, AgentState};
use crate::node::Node;
use crate::program::{Op, Program};
use crate::Status;

/// Compiled tree plus per-agent execution state.
pub struct Tree<K, A> {
    program: Program<K, A>,
    config: TreeConfig,
    boards: Option<BoardRegistry>,
    running: AtomicBool,
    agents: Mutex<HashMap<K, AgentState>>,
    rng: Mutex<StdRng>,
}

impl<K, A> Tree<K, A> {
    /// Create a new tree builder for a definition tree.
    pub fn builder(root: &Node<K, A>) -> TreeBuilder<'_, K, A> {
        TreeBuilder::new(root)
    }

    /// Wraps an already-compiled program with default settings.
    pub fn new(program: Program<K, A>) -> Self {
        Self::from_parts(program, TreeConfig::default(), None)
    }

    pub fn from_parts(
        program: Program<K, A>,
        config: TreeConfig,
        boards: Option<BoardRegistry>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            program,
            config,
            boards,
            running: AtomicBool::new(false),
            agents: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    pub fn program(&self) -> &Program<K, A> {
        &self.program
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn boards(&self) -> Option<&BoardRegistry> {
        self.boards.as_ref()
    }

    /// Returns `true` while a tick is in progress on this tree.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Picks one entry of a weighted jump table uniformly.
    pub(crate) fn pick(&self, table: &[usize]) -> Option<usize> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        table.choose(&mut *rng).copied()
    }

    fn agents(&self) -> RunResult<MutexGuard<'_, HashMap<K, AgentState>>> {
        self.agents.lock().map_err(|_| RunError::LockPoisoned)
    }
}

impl<K, A> Tree<K, A>
where
    K: Eq + Hash + Clone,
{
    /// Ticks `agent` once.
    ///
    /// Resumes from the instruction that suspended on the previous tick, or
    /// starts from the first instruction. Returns [`Status::Running`] when a
    /// task or sub-tree suspended; the cursor is rewound on success or failure.
    pub fn run(&self, agent: &K, args: &mut A) -> RunResult<Status> {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::warn!("rejected nested run on a tree that is already ticking");
            return Err(RunError::Reentrant);
        };

        let mut state = self.agents()?.remove(agent).unwrap_or_default();
        let result = interpreter::step(self, agent, &mut state, args);
        let cursor = state.cursor;
        self.agents()?.insert(agent.clone(), state);

        if let Ok(status) = &result {
            tracing::debug!(?status, cursor, "tick finished");
        }
        result
    }

    /// Cancels whatever `agent` is suspended on and rewinds it.
    ///
    /// A task suspended mid-run gets its `finish` hook called with
    /// [`Status::Failure`]; an agent suspended inside a sub-tree is aborted
    /// there as well. The blackboard is left untouched. Agents without state
    /// are ignored.
    ///
    /// An agent is checked out of the tree while it is being ticked, so
    /// aborting it from one of its own tasks does nothing.
    pub fn abort(&self, agent: &K, args: &mut A) {
        let Ok(mut agents) = self.agents() else {
            tracing::warn!("agent state lock poisoned; abort skipped");
            return;
        };
        let Some(mut state) = agents.remove(agent) else {
            if self.is_running() {
                tracing::debug!("abort skipped; agent may be the one being ticked");
            }
            return;
        };
        drop(agents);

        if state.paused {
            match self.program.get(state.cursor).map(|i| i.op()) {
                Some(Op::Task(task)) => {
                    if let Some(finish) = &task.finish {
                        let mut ctx = TaskContext {
                            agent,
                            blackboard: &mut state.blackboard,
                        };
                        finish(&mut ctx, Status::Failure, args);
                    }
                    tracing::debug!(task = %task.name, "aborted suspended task");
                }
                Some(Op::SubTree(sub)) => sub.abort(agent, args),
                _ => {}
            }
        }
        state.rewind();

        if let Ok(mut agents) = self.agents() {
            agents.insert(agent.clone(), state);
        }
    }

    /// Index of the instruction `agent` will resume from.
    ///
    /// `None` for agents that were never ticked or are being ticked right now.
    pub fn cursor(&self, agent: &K) -> Option<usize> {
        self.agents().ok()?.get(agent).map(|state| state.cursor)
    }

    /// Returns `true` if `agent` suspended on its last tick.
    pub fn is_suspended(&self, agent: &K) -> bool {
        self.agents()
            .ok()
            .and_then(|agents| agents.get(agent).map(|state| state.paused))
            .unwrap_or(false)
    }

    /// Snapshot of `agent`'s blackboard.
    pub fn blackboard(&self, agent: &K) -> Option<Blackboard> {
        self.agents()
            .ok()?
            .get(agent)
            .map(|state| state.blackboard.clone())
    }

    /// Mutates `agent`'s blackboard, creating the agent's state if needed.
    pub fn update_blackboard<R>(
        &self,
        agent: &K,
        f: impl FnOnce(&mut Blackboard) -> R,
    ) -> RunResult<R> {
        let mut agents = self.agents()?;
        let state = agents.entry(agent.clone()).or_default();
        Ok(f(&mut state.blackboard))
    }

    /// Discards `agent`'s state. Returns `false` if there was none.
    ///
    /// An agent suspended inside a sub-tree is removed from that sub-tree
    /// too. No `finish` hook runs; use [`Tree::abort`] first for that.
    pub fn remove_agent(&self, agent: &K) -> bool {
        let Ok(mut agents) = self.agents() else {
            return false;
        };
        let Some(state) = agents.remove(agent) else {
            return false;
        };
        drop(agents);

        if state.paused
            && let Some(Op::SubTree(sub)) = self.program.get(state.cursor).map(|i| i.op())
        {
            sub.remove_agent(agent);
        }
        true
    }

    pub fn agent_count(&self) -> usize {
        self.agents().map(|agents| agents.len()).unwrap_or(0)
    }
}

impl<K, A> fmt::Debug for Tree<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("instructions", &self.program.len())
            .field("config", &self.config)
            .field("shared_boards", &self.boards.is_some())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Builder that compiles a definition tree into a [`Tree`].
pub struct TreeBuilder<'n, K, A> {
    root: &'n Node<K, A>,
    config: TreeConfig,
    boards: Option<BoardRegistry>,
}

impl<'n, K, A> TreeBuilder<'n, K, A> {
    fn new(root: &'n Node<K, A>) -> Self {
        Self {
            root,
            config: TreeConfig::default(),
            boards: None,
        }
    }

    pub fn config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Instruction budget per tick; `0` means unlimited.
    pub fn step_limit(mut self, limit: usize) -> Self {
        self.config = self.config.with_step_limit(limit);
        self
    }

    /// Shared boards consulted by queries that do not target `self`.
    pub fn boards(mut self, boards: BoardRegistry) -> Self {
        self.boards = Some(boards);
        self
    }

    pub fn build(self) -> CompileResult<Tree<K, A>> {
        let program = compile(self.root)?;
        Ok(Tree::from_parts(program, self.config, self.boards))
    }
}

/// Holds a tree's running flag for the duration of one tick.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;

    #[test]
    fn running_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = RunningGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(RunningGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(RunningGuard::acquire(&flag).is_some());
    }

    #[test]
    fn agent_state_is_created_lazily() {
        let tree: Tree<u32, ()> = Tree::builder(&action("noop", |_, _| Ok(Status::Success)))
            .build()
            .unwrap();
        assert_eq!(tree.agent_count(), 0);
        assert_eq!(tree.cursor(&7), None);

        assert_eq!(tree.run(&7, &mut ()).unwrap(), Status::Success);
        assert_eq!(tree.agent_count(), 1);
        assert_eq!(tree.cursor(&7), Some(0));

        assert!(tree.remove_agent(&7));
        assert!(!tree.remove_agent(&7));
    }

    #[test]
    fn seeded_trees_pick_identically() {
        let table: Vec<usize> = (0..64).collect();
        let root = action::<u32, ()>("noop", |_, _| Ok(Status::Success));
        let first = Tree::builder(&root).seed(11).build().unwrap();
        let second = Tree::builder(&root).seed(11).build().unwrap();

        let picks = |tree: &Tree<u32, ()>| (0..16).map(|_| tree.pick(&table)).collect::<Vec<_>>();
        assert_eq!(picks(&first), picks(&second));
    }
}
