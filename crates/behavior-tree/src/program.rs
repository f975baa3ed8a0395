//! Compiled programs.
//!
//! A [`Program`] is the flat, jump-addressed form of a definition tree. Each
//! [`Instruction`] carries two exits, one per concluded outcome. Exits are
//! plain indices: `0..len` address instructions, [`Program::success_index`]
//! and [`Program::fail_index`] are the two terminals.

use std::fmt;
use std::sync::Arc;

use crate::node::{BlackboardQuery, FinishFn, RunFn, StartFn};
use crate::{Status, Tree};

/// A task whose `run` callable is known to be present.
pub struct CompiledTask<K, A> {
    pub name: String,
    pub start: Option<StartFn<K, A>>,
    pub run: RunFn<K, A>,
    pub finish: Option<FinishFn<K, A>>,
}

/// Instruction kinds understood by the interpreter.
pub enum Op<K, A> {
    Task(CompiledTask<K, A>),
    Query(BlackboardQuery),
    SubTree(Arc<Tree<K, A>>),
    /// Weighted jump table: one entry per unit of child weight.
    RandomBranch(Vec<usize>),
    /// Resets the paired counter and falls through to it.
    RepeatStart { counter: usize },
    /// Counts loop iterations; leaves via `on_success` once `goal` is exceeded.
    RepeatCounter { goal: u32, body: usize },
    HangingSucceed,
    HangingFail,
}

impl<K, A> Op<K, A> {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Task(_) => "task",
            Op::Query(_) => "query",
            Op::SubTree(_) => "sub_tree",
            Op::RandomBranch(_) => "random_branch",
            Op::RepeatStart { .. } => "repeat_start",
            Op::RepeatCounter { .. } => "repeat_counter",
            Op::HangingSucceed => "hanging_succeed",
            Op::HangingFail => "hanging_fail",
        }
    }
}

impl<K, A> fmt::Debug for Op<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Task(task) => write!(f, "task {:?}", task.name),
            Op::Query(query) => write!(
                f,
                "query {}.{} {}",
                query.board, query.key, query.predicate
            ),
            Op::SubTree(tree) => write!(f, "sub_tree ({} instructions)", tree.program().len()),
            Op::RandomBranch(table) => write!(f, "random_branch {:?}", table),
            Op::RepeatStart { counter } => write!(f, "repeat_start counter={}", counter),
            Op::RepeatCounter { goal, body } => {
                write!(f, "repeat_counter goal={} body={}", goal, body)
            }
            Op::HangingSucceed | Op::HangingFail => f.write_str(self.name()),
        }
    }
}

/// One compiled instruction with its resolved exits.
#[derive(Debug)]
pub struct Instruction<K, A> {
    op: Op<K, A>,
    on_success: usize,
    on_fail: usize,
}

impl<K, A> Instruction<K, A> {
    pub(crate) fn new(op: Op<K, A>, on_success: usize, on_fail: usize) -> Self {
        Self {
            op,
            on_success,
            on_fail,
        }
    }

    pub fn op(&self) -> &Op<K, A> {
        &self.op
    }

    pub fn on_success(&self) -> usize {
        self.on_success
    }

    pub fn on_fail(&self) -> usize {
        self.on_fail
    }

    /// Exit taken for a concluded status.
    #[inline]
    pub fn exit(&self, status: Status) -> usize {
        if status.is_success() {
            self.on_success
        } else {
            self.on_fail
        }
    }
}

/// Immutable instruction sequence shared by every agent of a tree.
#[derive(Debug)]
pub struct Program<K, A> {
    instructions: Vec<Instruction<K, A>>,
}

impl<K, A> Program<K, A> {
    pub(crate) fn from_instructions(instructions: Vec<Instruction<K, A>>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction<K, A>> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction<K, A>] {
        &self.instructions
    }

    /// Terminal index meaning the whole tree succeeded.
    pub fn success_index(&self) -> usize {
        self.instructions.len()
    }

    /// Terminal index meaning the whole tree failed.
    pub fn fail_index(&self) -> usize {
        self.instructions.len() + 1
    }

    /// Maps a terminal index to its status, `None` for in-range indices.
    pub fn terminal_status(&self, index: usize) -> Option<Status> {
        if index == self.success_index() {
            Some(Status::Success)
        } else if index == self.fail_index() {
            Some(Status::Failure)
        } else {
            None
        }
    }

    fn exit_label(&self, index: usize) -> String {
        match self.terminal_status(index) {
            Some(Status::Success) => "SUCCESS".to_owned(),
            Some(_) => "FAIL".to_owned(),
            None => index.to_string(),
        }
    }
}

impl<K, A> fmt::Display for Program<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(
                f,
                "{:>4}: {:<40} ok -> {:<8} fail -> {}",
                index,
                format!("{:?}", instruction.op),
                self.exit_label(instruction.on_success),
                self.exit_label(instruction.on_fail),
            )?;
        }
        Ok(())
    }
}
