//! Lowering rules for decorator nodes.
//!
//! Decorators wrap at most one child and only rewrite the placeholders left
//! in that child's range; they emit no instruction of their own except the
//! repeat counter pair and the childless succeed/fail forms.

use super::composite::bounded;
use super::{Compiler, Exit, Outcome};
use crate::error::{CompileError, CompileResult};
use crate::node::Node;
use crate::program::Op;

impl<K, A> Compiler<K, A> {
    fn only_child<'n>(&self, node: &'n Node<K, A>) -> CompileResult<Option<&'n Node<K, A>>> {
        match node.children.as_slice() {
            [] => Ok(None),
            [child] => Ok(Some(child)),
            many => Err(CompileError::TooManyChildren {
                kind: node.kind.name(),
                path: self.path.clone(),
                count: many.len(),
            }),
        }
    }

    fn required_child<'n>(&self, node: &'n Node<K, A>) -> CompileResult<&'n Node<K, A>> {
        self.only_child(node)?
            .ok_or_else(|| CompileError::MissingChild {
                kind: node.kind.name(),
                path: self.path.clone(),
            })
    }

    /// Succeed and Fail: fold the opposite outcome into `outcome`.
    ///
    /// Without a child, a hanging instruction concludes with `outcome` directly.
    pub(super) fn force(&mut self, node: &Node<K, A>, outcome: Outcome) -> CompileResult<()> {
        match self.only_child(node)? {
            Some(child) => {
                let range = self.child(0, child)?;
                self.patch(range, outcome.flip(), Exit::Placeholder(outcome));
            }
            None => {
                let op = match outcome {
                    Outcome::Success => Op::HangingSucceed,
                    Outcome::Fail => Op::HangingFail,
                };
                self.emit(op);
            }
        }
        Ok(())
    }

    pub(super) fn invert(&mut self, node: &Node<K, A>) -> CompileResult<()> {
        let child = self.required_child(node)?;
        let range = self.child(0, child)?;
        self.map_placeholders(range, |outcome| Exit::Placeholder(outcome.flip()));
        Ok(())
    }

    /// Loops the child through a counter pair, or straight back to its own
    /// start when unbounded.
    ///
    /// Success placeholders always loop. Failure placeholders loop unless
    /// `break_on_fail`, in which case they propagate.
    pub(super) fn repeat(
        &mut self,
        node: &Node<K, A>,
        count: Option<u32>,
        break_on_fail: bool,
    ) -> CompileResult<()> {
        let child = self.required_child(node)?;

        let counter = bounded(count).map(|goal| self.repeat_header(goal));
        let body = self.child(0, child)?;
        let target = counter.unwrap_or(body.start);

        self.patch(body.clone(), Outcome::Success, Exit::Resolved(target));
        if !break_on_fail {
            self.patch(body, Outcome::Fail, Exit::Resolved(target));
        }
        Ok(())
    }
}
