//! Node definition trees.
//!
//! A [`Node`] is the declarative input to the compiler: a kind tag, an ordered
//! list of children and a weight used when the parent is a random composite.
//! Definitions are deliberately permissive (optional callables, free-form
//! child lists) so that authoring layers can build them incrementally;
//! [`compile`](crate::compile) rejects anything malformed.

use std::fmt;
use std::sync::Arc;

use crate::behavior::{Behavior, TaskContext, TaskResult};
use crate::blackboard::{BoardRef, Predicate};
use crate::{Status, Tree};

pub type StartFn<K, A> = Arc<dyn Fn(&mut TaskContext<'_, K>, &mut A) + Send + Sync>;
pub type RunFn<K, A> = Arc<dyn Fn(&mut TaskContext<'_, K>, &mut A) -> TaskResult + Send + Sync>;
pub type FinishFn<K, A> = Arc<dyn Fn(&mut TaskContext<'_, K>, Status, &mut A) + Send + Sync>;

/// Callables backing a task leaf.
///
/// `run` is mandatory for compilation; `start` and `finish` are optional.
pub struct Task<K, A> {
    pub name: String,
    pub start: Option<StartFn<K, A>>,
    pub run: Option<RunFn<K, A>>,
    pub finish: Option<FinishFn<K, A>>,
}

impl<K, A> Task<K, A> {
    /// Creates a task with no callables attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            run: None,
            finish: None,
        }
    }

    pub fn on_start(
        mut self,
        start: impl Fn(&mut TaskContext<'_, K>, &mut A) + Send + Sync + 'static,
    ) -> Self {
        self.start = Some(Arc::new(start));
        self
    }

    pub fn on_run(
        mut self,
        run: impl Fn(&mut TaskContext<'_, K>, &mut A) -> TaskResult + Send + Sync + 'static,
    ) -> Self {
        self.run = Some(Arc::new(run));
        self
    }

    pub fn on_finish(
        mut self,
        finish: impl Fn(&mut TaskContext<'_, K>, Status, &mut A) + Send + Sync + 'static,
    ) -> Self {
        self.finish = Some(Arc::new(finish));
        self
    }
}

impl<K: 'static, A: 'static> Task<K, A> {
    /// Wraps a [`Behavior`] implementation, wiring all three hooks to it.
    pub fn from_behavior<B>(name: impl Into<String>, behavior: B) -> Self
    where
        B: Behavior<K, A> + 'static,
    {
        let behavior = Arc::new(behavior);
        let (start, run, finish) = (behavior.clone(), behavior.clone(), behavior);

        Task::new(name)
            .on_start(move |ctx, args| start.start(ctx, args))
            .on_run(move |ctx, args| run.run(ctx, args))
            .on_finish(move |ctx, status, args| finish.finish(ctx, status, args))
    }
}

impl<K, A> Clone for Task<K, A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            start: self.start.clone(),
            run: self.run.clone(),
            finish: self.finish.clone(),
        }
    }
}

impl<K, A> fmt::Debug for Task<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("start", &self.start.is_some())
            .field("run", &self.run.is_some())
            .field("finish", &self.finish.is_some())
            .finish()
    }
}

/// Leaf that tests one blackboard entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlackboardQuery {
    pub board: BoardRef,
    pub key: String,
    pub predicate: Predicate,
}

impl BlackboardQuery {
    /// Builds a query from authoring strings: `board` is `"self"` or a shared
    /// board name, `predicate` uses the [`Predicate`] vocabulary.
    pub fn new(board: &str, key: impl Into<String>, predicate: &str) -> Self {
        Self {
            board: BoardRef::parse(board),
            key: key.into(),
            predicate: Predicate::parse(predicate),
        }
    }
}

/// Kind tag and kind-specific parameters of a [`Node`].
#[derive(strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind<K, A> {
    Task(Task<K, A>),
    BlackboardQuery(BlackboardQuery),
    /// Delegates to an already-compiled tree; `None` is an unresolved link.
    SubTree(Option<Arc<Tree<K, A>>>),
    Sequence,
    Selector,
    Random,
    /// `count` bounds the number of loop iterations; `None` or zero loops forever.
    While {
        count: Option<u32>,
    },
    Succeed,
    Fail,
    Invert,
    /// `count` of `None` or zero repeats forever.
    Repeat {
        count: Option<u32>,
        break_on_fail: bool,
    },
}

impl<K, A> NodeKind<K, A> {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeKind::Task(_) | NodeKind::BlackboardQuery(_) | NodeKind::SubTree(_)
        )
    }
}

impl<K, A> fmt::Debug for NodeKind<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Task(task) => f.debug_tuple("Task").field(task).finish(),
            NodeKind::BlackboardQuery(query) => {
                f.debug_tuple("BlackboardQuery").field(query).finish()
            }
            NodeKind::SubTree(tree) => f.debug_tuple("SubTree").field(&tree.is_some()).finish(),
            NodeKind::While { count } => f.debug_struct("While").field("count", count).finish(),
            NodeKind::Repeat {
                count,
                break_on_fail,
            } => f
                .debug_struct("Repeat")
                .field("count", count)
                .field("break_on_fail", break_on_fail)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// One node of a definition tree.
pub struct Node<K, A> {
    pub kind: NodeKind<K, A>,
    pub children: Vec<Node<K, A>>,
    /// Relative selection weight when the parent is a random composite.
    pub weight: u32,
}

impl<K, A> Node<K, A> {
    pub const DEFAULT_WEIGHT: u32 = 1;

    pub fn new(kind: NodeKind<K, A>) -> Self {
        Self {
            kind,
            children: Vec::new(),
            weight: Self::DEFAULT_WEIGHT,
        }
    }

    pub fn with_children(mut self, children: Vec<Node<K, A>>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: Node<K, A>) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

impl<K, A> fmt::Debug for Node<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("weight", &self.weight)
            .field("children", &self.children)
            .finish()
    }
}
