//! Lowering rules for composite nodes.
//!
//! - Sequence: a child's success continues with the next child (AND logic)
//! - Selector: a child's failure continues with the next child (OR logic)
//! - Random: a weighted jump table picks exactly one child
//! - While: retries the action while the condition holds

use std::iter;

use super::{Compiler, Exit, Outcome};
use crate::error::{CompileError, CompileResult};
use crate::node::Node;
use crate::program::Op;

impl<K, A> Compiler<K, A> {
    fn require_children(&self, node: &Node<K, A>) -> CompileResult<()> {
        if node.children.is_empty() {
            return Err(CompileError::EmptyComposite {
                kind: node.kind.name(),
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Compiles children back to back, sending each non-last child's `carry`
    /// outcome to the next child's start.
    ///
    /// Sequences carry success, selectors carry failure. The opposite outcome,
    /// and the last child's exits, propagate to the enclosing node.
    pub(super) fn chain(&mut self, node: &Node<K, A>, carry: Outcome) -> CompileResult<()> {
        self.require_children(node)?;

        let last = node.children.len() - 1;
        for (index, child) in node.children.iter().enumerate() {
            let range = self.child(index, child)?;
            if index < last {
                let next = self.next_index();
                self.patch(range, carry, Exit::Resolved(next));
            }
        }
        Ok(())
    }

    pub(super) fn random(&mut self, node: &Node<K, A>) -> CompileResult<()> {
        self.require_children(node)?;

        let branch = self.emit(Op::RandomBranch(Vec::new()));
        let mut table = Vec::new();
        for (index, child) in node.children.iter().enumerate() {
            let range = self.child(index, child)?;
            table.extend(iter::repeat(range.start).take(child.weight as usize));
        }

        if table.is_empty() {
            return Err(CompileError::ZeroWeight {
                path: self.path.clone(),
            });
        }
        self.pending[branch].op = Op::RandomBranch(table);
        Ok(())
    }

    /// Lays out `[counter pair] condition action`.
    ///
    /// Condition success enters the action and condition failure propagates.
    /// Action failure loops back (to the counter when bounded) and action
    /// success propagates.
    pub(super) fn while_loop(&mut self, node: &Node<K, A>, count: Option<u32>) -> CompileResult<()> {
        let [condition, action] = node.children.as_slice() else {
            return Err(CompileError::WhileArity {
                path: self.path.clone(),
                count: node.children.len(),
            });
        };

        let loop_start = match bounded(count) {
            Some(goal) => self.repeat_header(goal),
            None => self.next_index(),
        };

        let condition = self.child(0, condition)?;
        let action_start = self.next_index();
        self.patch(condition, Outcome::Success, Exit::Resolved(action_start));

        let action = self.child(1, action)?;
        self.patch(action, Outcome::Fail, Exit::Resolved(loop_start));
        Ok(())
    }
}

/// A loop count of zero means unbounded.
pub(super) fn bounded(count: Option<u32>) -> Option<u32> {
    count.filter(|&goal| goal > 0)
}
