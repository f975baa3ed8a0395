//! Stepping interpreter.
//!
//! Walks a [`Program`](crate::Program) for one agent, starting at the agent's
//! cursor, until the cursor reaches a terminal index or a task / sub-tree
//! suspends. Loop counters are kept per agent, keyed by the index of their
//! `RepeatCounter` instruction, so agents sharing a program never see each
//! other's iterations.

use std::collections::HashMap;
use std::hash::Hash;

use crate::behavior::TaskContext;
use crate::blackboard::{Blackboard, BoardRef, BoardRegistry};
use crate::error::{RunError, RunResult};
use crate::node::BlackboardQuery;
use crate::program::{CompiledTask, Op};
use crate::{Status, Tree};

/// Execution state of one agent against one tree.
#[derive(Debug, Default)]
pub(crate) struct AgentState {
    pub(crate) cursor: usize,
    pub(crate) paused: bool,
    pub(crate) blackboard: Blackboard,
    pub(crate) counters: HashMap<usize, u32>,
}

impl AgentState {
    /// Rewinds to the first instruction; the blackboard is kept.
    pub(crate) fn rewind(&mut self) {
        self.cursor = 0;
        self.paused = false;
    }

    fn suspend(&mut self, cursor: usize) -> Status {
        self.cursor = cursor;
        self.paused = true;
        Status::Running
    }
}

/// Ticks `agent` once through `tree`'s program.
pub(crate) fn step<K, A>(
    tree: &Tree<K, A>,
    agent: &K,
    state: &mut AgentState,
    args: &mut A,
) -> RunResult<Status>
where
    K: Eq + Hash + Clone,
{
    let program = tree.program();
    let step_limit = tree.config().effective_step_limit();
    let mut cursor = state.cursor;
    let mut resumed = std::mem::take(&mut state.paused);
    let mut steps = 0usize;

    if cursor >= program.len() {
        state.rewind();
        return Err(RunError::InvalidCursor {
            cursor,
            len: program.len(),
        });
    }

    while let Some(instruction) = program.get(cursor) {
        if let Some(limit) = step_limit {
            steps += 1;
            if steps > limit {
                tracing::warn!(limit, cursor, "tick exceeded its step limit");
                state.rewind();
                return Err(RunError::StepLimit { limit });
            }
        }

        tracing::trace!(cursor, op = instruction.op().name(), resumed, "dispatch");

        let next = match instruction.op() {
            Op::Task(task) => match run_task(task, agent, state, args, resumed) {
                Status::Running => return Ok(state.suspend(cursor)),
                done => instruction.exit(done),
            },
            Op::Query(query) => match evaluate(query, &state.blackboard, tree.boards()) {
                Ok(true) => instruction.on_success(),
                Ok(false) => instruction.on_fail(),
                Err(err) => {
                    tracing::error!(index = cursor, error = %err, "shared blackboard unavailable");
                    state.rewind();
                    return Err(err);
                }
            },
            Op::SubTree(sub) => match sub.run(agent, args) {
                Ok(Status::Running) => return Ok(state.suspend(cursor)),
                Ok(done) => instruction.exit(done),
                Err(source) => {
                    tracing::error!(index = cursor, error = %source, "sub-tree tick failed");
                    state.rewind();
                    return Err(RunError::SubTree {
                        index: cursor,
                        source: Box::new(source),
                    });
                }
            },
            Op::RandomBranch(table) => match tree.pick(table) {
                Some(target) => target,
                None => {
                    state.rewind();
                    return Err(RunError::CorruptProgram {
                        index: cursor,
                        reason: "random branch has an empty jump table",
                    });
                }
            },
            Op::RepeatStart { counter } => {
                state.counters.insert(*counter, 0);
                instruction.on_success()
            }
            Op::RepeatCounter { goal, body } => {
                let count = state.counters.entry(cursor).or_insert(0);
                *count += 1;
                if *count > *goal {
                    instruction.on_success()
                } else {
                    *body
                }
            }
            Op::HangingSucceed => instruction.on_success(),
            Op::HangingFail => instruction.on_fail(),
        };

        resumed = false;
        cursor = next;
    }

    state.rewind();
    program
        .terminal_status(cursor)
        .ok_or(RunError::InvalidCursor {
            cursor,
            len: program.len(),
        })
}

fn run_task<K, A>(
    task: &CompiledTask<K, A>,
    agent: &K,
    state: &mut AgentState,
    args: &mut A,
    resumed: bool,
) -> Status {
    let mut ctx = TaskContext {
        agent,
        blackboard: &mut state.blackboard,
    };

    if !resumed && let Some(start) = &task.start {
        start(&mut ctx, args);
    }

    let status = match (task.run)(&mut ctx, args) {
        Ok(status) => status,
        Err(err) => {
            tracing::warn!(task = %task.name, error = %err, "task reported no status; treating as failure");
            Status::Failure
        }
    };

    if status.is_done() && let Some(finish) = &task.finish {
        finish(&mut ctx, status, args);
    }
    status
}

/// Tests a query; a shared board that is not registered counts as false.
fn evaluate(
    query: &BlackboardQuery,
    own: &Blackboard,
    boards: Option<&BoardRegistry>,
) -> RunResult<bool> {
    let name = match &query.board {
        BoardRef::Own => return Ok(query.predicate.test(own.get(&query.key))),
        BoardRef::Shared(name) => name,
    };

    let found = match boards {
        Some(registry) => {
            registry.read(name, |board| query.predicate.test(board.get(&query.key)))?
        }
        None => None,
    };
    Ok(found.unwrap_or_else(|| {
        tracing::warn!(board = %name, key = %query.key, "shared blackboard not registered; query fails");
        false
    }))
}
