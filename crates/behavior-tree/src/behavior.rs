//! Task provider trait.
//!
//! This module defines the [`Behavior`] trait, the seam through which tree
//! leaves call into application code. A behavior is generic over the agent
//! identity `K` and the tick arguments `A` passed to [`Tree::run`](crate::Tree::run).

use crate::{Blackboard, Status, TaskError};

/// What a task's `run` callable returns.
///
/// An `Err` means the task could not report a status; the interpreter logs
/// it and treats the task as failed.
pub type TaskResult = Result<Status, TaskError>;

/// Per-call view of the ticking agent handed to task callables.
pub struct TaskContext<'a, K> {
    /// Identity of the agent being ticked.
    pub agent: &'a K,
    /// The agent's own blackboard.
    pub blackboard: &'a mut Blackboard,
}

/// A long-lived task provider with `start` / `run` / `finish` hooks.
///
/// # Lifecycle
///
/// - `start` runs when the task is entered fresh, never on a resumed tick
/// - `run` runs on every visit; returning [`Status::Running`] suspends the agent
/// - `finish` runs once the task concludes, or with [`Status::Failure`] when
///   the agent is aborted while suspended on this task
pub trait Behavior<K, A>: Send + Sync {
    fn start(&self, _ctx: &mut TaskContext<'_, K>, _args: &mut A) {}

    fn run(&self, ctx: &mut TaskContext<'_, K>, args: &mut A) -> TaskResult;

    fn finish(&self, _ctx: &mut TaskContext<'_, K>, _status: Status, _args: &mut A) {}
}

/// Blanket implementation for boxed behaviors.
///
/// This allows `Box<dyn Behavior<K, A>>` to be handed to
/// [`Task::from_behavior`](crate::Task::from_behavior) directly.
impl<K, A> Behavior<K, A> for Box<dyn Behavior<K, A>> {
    #[inline]
    fn start(&self, ctx: &mut TaskContext<'_, K>, args: &mut A) {
        (**self).start(ctx, args);
    }

    #[inline]
    fn run(&self, ctx: &mut TaskContext<'_, K>, args: &mut A) -> TaskResult {
        (**self).run(ctx, args)
    }

    #[inline]
    fn finish(&self, ctx: &mut TaskContext<'_, K>, status: Status, args: &mut A) {
        (**self).finish(ctx, status, args);
    }
}
