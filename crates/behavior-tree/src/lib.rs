//! Compiled, resumable behavior trees.
//!
//! This library turns a declarative definition tree into a flat program once,
//! then ticks any number of agents through it, each with its own cursor and
//! blackboard.
//!
//! - **Compile once**: definitions are lowered to jump-addressed instructions
//! - **Resumable**: tasks may report `Running` and are resumed next tick
//! - **Per-agent state**: one program serves every agent; loop counters and
//!   cursors live with the agent
//! - **Cooperative**: one tick runs to completion before the next starts
//!
//! # Architecture
//!
//! - [`Node`]: definition tree input, built with the [`builder`] helpers
//! - [`compile`]: lowers a definition into a [`Program`]
//! - [`Tree`]: owns a program and per-agent state; exposes [`Tree::run`] and [`Tree::abort`]
//! - [`Behavior`]: task provider trait (`start` / `run` / `finish`)
//! - [`Blackboard`], [`BoardRegistry`]: data consulted by blackboard queries
//! - [`Status`]: Success, Failure or Running
//!
//! # Example
//!
//! ```rust
//! use behavior_tree::builder::{action, query, selector, sequence};
//! use behavior_tree::{Status, Tree};
//!
//! let root = selector(vec![
//!     sequence(vec![
//!         query("self", "enemy_visible", "true"),
//!         action("attack", |_, _: &mut ()| Ok(Status::Success)),
//!     ]),
//!     action("patrol", |_, _: &mut ()| Ok(Status::Running)),
//! ]);
//!
//! let tree: Tree<u32, ()> = Tree::builder(&root).build().unwrap();
//! assert_eq!(tree.run(&1u32, &mut ()).unwrap(), Status::Running);
//!
//! tree.update_blackboard(&1u32, |board| board.set("enemy_visible", true)).unwrap();
//! tree.abort(&1u32, &mut ());
//! assert_eq!(tree.run(&1u32, &mut ()).unwrap(), Status::Success);
//! ```

pub mod behavior;
pub mod blackboard;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod error;
pub mod node;
pub mod program;
pub mod status;
pub mod tree;

mod interpreter;

// Re-export core types for ergonomic API
pub use behavior::{Behavior, TaskContext, TaskResult};
pub use blackboard::{Blackboard, BoardRef, BoardRegistry, Predicate, Value};
pub use compiler::compile;
pub use config::TreeConfig;
pub use error::{CompileError, CompileResult, NodePath, RunError, RunResult, TaskError};
pub use node::{BlackboardQuery, Node, NodeKind, Task};
pub use program::{Instruction, Op, Program};
pub use status::Status;
pub use tree::{Tree, TreeBuilder};
