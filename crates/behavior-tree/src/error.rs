//! Error types for compilation and ticking.
//!
//! Compile errors are fatal: a malformed definition never produces a
//! [`Program`](crate::Program). Run errors are reserved for conditions the
//! interpreter cannot recover from locally; task-level problems are logged
//! and folded into [`Status::Failure`](crate::Status::Failure) instead.

use std::fmt;

use thiserror::Error;

pub type CompileResult<T> = std::result::Result<T, CompileError>;

pub type RunResult<T> = std::result::Result<T, RunError>;

/// Location of a node inside its definition tree, as child indices from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub(crate) fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root")?;
        for index in &self.0 {
            write!(f, ".{}", index)?;
        }
        Ok(())
    }
}

/// Construction-time failures reported by [`compile`](crate::compile).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("task at {path} has no run callable")]
    MissingTaskRun { path: NodePath },

    #[error("sub-tree at {path} has no resolved tree")]
    MissingSubTree { path: NodePath },

    #[error("{kind} at {path} must have at least one child")]
    EmptyComposite { kind: &'static str, path: NodePath },

    #[error("{kind} at {path} accepts at most one child, got {count}")]
    TooManyChildren {
        kind: &'static str,
        path: NodePath,
        count: usize,
    },

    #[error("{kind} at {path} requires exactly one child")]
    MissingChild { kind: &'static str, path: NodePath },

    #[error("while at {path} requires a condition and an action, got {count} children")]
    WhileArity { path: NodePath, count: usize },

    #[error("{kind} at {path} is a leaf but has {count} children")]
    LeafWithChildren {
        kind: &'static str,
        path: NodePath,
        count: usize,
    },

    #[error("random at {path} has a total child weight of zero")]
    ZeroWeight { path: NodePath },

    #[error("instruction {index} jumps to {target}, outside a program of {len} instructions")]
    JumpOutOfRange {
        index: usize,
        target: usize,
        len: usize,
    },
}

/// Failures surfaced by [`Tree::run`](crate::Tree::run).
#[derive(Debug, Error)]
pub enum RunError {
    #[error("tree is already running; nested run on the same tree rejected")]
    Reentrant,

    #[error("agent state lock poisoned")]
    LockPoisoned,

    #[error("tick exceeded the step limit of {limit} instructions")]
    StepLimit { limit: usize },

    #[error("cursor {cursor} is outside a program of {len} instructions")]
    InvalidCursor { cursor: usize, len: usize },

    #[error("corrupt program at instruction {index}: {reason}")]
    CorruptProgram { index: usize, reason: &'static str },

    #[error("sub-tree at instruction {index} failed")]
    SubTree {
        index: usize,
        #[source]
        source: Box<RunError>,
    },
}

/// Returned by a task's `run` when it cannot report a status.
///
/// The interpreter logs the error and treats the task as failed.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    pub fn msg(message: impl Into<String>) -> Self {
        TaskError::Message(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path_renders_indices() {
        let mut path = NodePath::root();
        assert_eq!(path.to_string(), "root");

        path.push(1);
        path.push(0);
        assert_eq!(path.to_string(), "root.1.0");

        path.pop();
        assert_eq!(path.indices(), &[1]);
    }

    #[test]
    fn sub_tree_error_keeps_source() {
        let err = RunError::SubTree {
            index: 3,
            source: Box::new(RunError::Reentrant),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("tree is already running; nested run on the same tree rejected")
        );
    }
}
