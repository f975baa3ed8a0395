//! Builder utilities for ergonomic definition tree construction.
//!
//! This module provides helper functions to reduce boilerplate when building
//! definition trees. Instead of writing verbose
//! `Node::new(NodeKind::Sequence).with_children(vec![...])`, you can use
//! shorter functions like `sequence(vec![...])`.

use std::sync::Arc;

use crate::behavior::{TaskContext, TaskResult};
use crate::node::{BlackboardQuery, Node, NodeKind, Task};
use crate::Tree;

/// Creates a task leaf.
#[inline]
pub fn task<K, A>(task: Task<K, A>) -> Node<K, A> {
    Node::new(NodeKind::Task(task))
}

/// Creates a task leaf with only a `run` callable.
///
/// Shorthand for `task(Task::new(name).on_run(run))`.
#[inline]
pub fn action<K, A>(
    name: impl Into<String>,
    run: impl Fn(&mut TaskContext<'_, K>, &mut A) -> TaskResult + Send + Sync + 'static,
) -> Node<K, A> {
    task(Task::new(name).on_run(run))
}

/// Creates a blackboard query leaf.
///
/// `board` is `"self"` for the agent's own blackboard or the name of a shared
/// board; `predicate` is `true`, `false`, `unset`, `set` or a literal.
#[inline]
pub fn query<K, A>(board: &str, key: impl Into<String>, predicate: &str) -> Node<K, A> {
    Node::new(NodeKind::BlackboardQuery(BlackboardQuery::new(
        board, key, predicate,
    )))
}

/// Creates a leaf delegating to an already-built tree.
#[inline]
pub fn subtree<K, A>(tree: Arc<Tree<K, A>>) -> Node<K, A> {
    Node::new(NodeKind::SubTree(Some(tree)))
}

/// Creates a sequence node.
#[inline]
pub fn sequence<K, A>(children: Vec<Node<K, A>>) -> Node<K, A> {
    Node::new(NodeKind::Sequence).with_children(children)
}

/// Creates a selector node.
#[inline]
pub fn selector<K, A>(children: Vec<Node<K, A>>) -> Node<K, A> {
    Node::new(NodeKind::Selector).with_children(children)
}

/// Creates a random node; each child is picked in proportion to its weight.
#[inline]
pub fn random<K, A>(children: Vec<Node<K, A>>) -> Node<K, A> {
    Node::new(NodeKind::Random).with_children(children)
}

/// Creates an unbounded while node from a condition and an action.
#[inline]
pub fn while_loop<K, A>(condition: Node<K, A>, action: Node<K, A>) -> Node<K, A> {
    Node::new(NodeKind::While { count: None }).with_children(vec![condition, action])
}

/// Creates a while node that gives up looping after `count` iterations.
#[inline]
pub fn while_count<K, A>(condition: Node<K, A>, action: Node<K, A>, count: u32) -> Node<K, A> {
    Node::new(NodeKind::While { count: Some(count) }).with_children(vec![condition, action])
}

/// Creates an always-succeed decorator around `child`.
#[inline]
pub fn succeed<K, A>(child: Node<K, A>) -> Node<K, A> {
    Node::new(NodeKind::Succeed).with_child(child)
}

/// Creates an always-fail decorator around `child`.
#[inline]
pub fn fail<K, A>(child: Node<K, A>) -> Node<K, A> {
    Node::new(NodeKind::Fail).with_child(child)
}

/// Creates a childless succeed node that concludes immediately.
#[inline]
pub fn hanging_succeed<K, A>() -> Node<K, A> {
    Node::new(NodeKind::Succeed)
}

/// Creates a childless fail node that concludes immediately.
#[inline]
pub fn hanging_fail<K, A>() -> Node<K, A> {
    Node::new(NodeKind::Fail)
}

/// Creates an inverter node.
#[inline]
pub fn invert<K, A>(child: Node<K, A>) -> Node<K, A> {
    Node::new(NodeKind::Invert).with_child(child)
}

/// Repeats `child` `count` times, regardless of its outcome.
#[inline]
pub fn repeat<K, A>(child: Node<K, A>, count: u32) -> Node<K, A> {
    Node::new(NodeKind::Repeat {
        count: Some(count),
        break_on_fail: false,
    })
    .with_child(child)
}

/// Repeats `child` up to `count` times (forever when `None`), stopping on failure.
#[inline]
pub fn repeat_until_fail<K, A>(child: Node<K, A>, count: Option<u32>) -> Node<K, A> {
    Node::new(NodeKind::Repeat {
        count,
        break_on_fail: true,
    })
    .with_child(child)
}

/// Repeats `child` forever.
#[inline]
pub fn repeat_forever<K, A>(child: Node<K, A>) -> Node<K, A> {
    Node::new(NodeKind::Repeat {
        count: None,
        break_on_fail: false,
    })
    .with_child(child)
}
