//! Definition tree compiler.
//!
//! Lowers a [`Node`] tree into a flat [`Program`] in one depth-first pass.
//! Every node occupies a contiguous range of instructions. Leaves are emitted
//! with placeholder exits ("propagate success" / "propagate failure"); each
//! enclosing composite or decorator then rewrites the placeholders left in
//! its children's ranges. Exits that an inner node already resolved to an
//! index are never touched again. Once the root is compiled, the remaining
//! placeholders become the two terminal indices.
//!
//! Placeholders are rewritten by value, whichever field holds them: after a
//! succeed decorator, a leaf's failure exit carries a success placeholder and
//! is treated as success by every enclosing node.

mod composite;
mod decorator;

use std::ops::Range;
use std::sync::Arc;

use crate::error::{CompileError, CompileResult, NodePath};
use crate::node::{Node, NodeKind, Task};
use crate::program::{CompiledTask, Instruction, Op, Program};
use crate::Tree;

/// Compiles a definition tree into a program.
pub fn compile<K, A>(root: &Node<K, A>) -> CompileResult<Program<K, A>> {
    let mut compiler = Compiler::new();
    compiler.node(root)?;
    let program = compiler.finish()?;

    tracing::debug!(
        instructions = program.len(),
        root = root.kind.name(),
        "compiled behavior tree"
    );
    Ok(program)
}

/// Outcome an unresolved exit propagates to the enclosing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Fail,
}

impl Outcome {
    fn flip(self) -> Self {
        match self {
            Outcome::Success => Outcome::Fail,
            Outcome::Fail => Outcome::Success,
        }
    }
}

/// Exit of an instruction under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    Placeholder(Outcome),
    Resolved(usize),
}

pub(crate) struct PendingInstruction<K, A> {
    op: Op<K, A>,
    on_success: Exit,
    on_fail: Exit,
}

pub(crate) struct Compiler<K, A> {
    pending: Vec<PendingInstruction<K, A>>,
    path: NodePath,
}

impl<K, A> Compiler<K, A> {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
            path: NodePath::root(),
        }
    }

    /// Index the next emitted instruction will occupy.
    fn next_index(&self) -> usize {
        self.pending.len()
    }

    /// Emits an instruction whose exits propagate to the enclosing node.
    fn emit(&mut self, op: Op<K, A>) -> usize {
        self.emit_with(
            op,
            Exit::Placeholder(Outcome::Success),
            Exit::Placeholder(Outcome::Fail),
        )
    }

    fn emit_with(&mut self, op: Op<K, A>, on_success: Exit, on_fail: Exit) -> usize {
        let index = self.next_index();
        self.pending.push(PendingInstruction {
            op,
            on_success,
            on_fail,
        });
        index
    }

    /// Compiles the node at child position `index` of the current node.
    fn child(&mut self, index: usize, node: &Node<K, A>) -> CompileResult<Range<usize>> {
        self.path.push(index);
        let range = self.node(node);
        self.path.pop();
        range
    }

    fn node(&mut self, node: &Node<K, A>) -> CompileResult<Range<usize>> {
        let start = self.next_index();

        if node.kind.is_leaf() && !node.children.is_empty() {
            return Err(CompileError::LeafWithChildren {
                kind: node.kind.name(),
                path: self.path.clone(),
                count: node.children.len(),
            });
        }

        match &node.kind {
            NodeKind::Task(task) => self.task(task)?,
            NodeKind::BlackboardQuery(query) => {
                self.emit(Op::Query(query.clone()));
            }
            NodeKind::SubTree(tree) => self.sub_tree(tree.as_ref())?,
            NodeKind::Sequence => self.chain(node, Outcome::Success)?,
            NodeKind::Selector => self.chain(node, Outcome::Fail)?,
            NodeKind::Random => self.random(node)?,
            NodeKind::While { count } => self.while_loop(node, *count)?,
            NodeKind::Succeed => self.force(node, Outcome::Success)?,
            NodeKind::Fail => self.force(node, Outcome::Fail)?,
            NodeKind::Invert => self.invert(node)?,
            NodeKind::Repeat {
                count,
                break_on_fail,
            } => self.repeat(node, *count, *break_on_fail)?,
        }

        Ok(start..self.next_index())
    }

    fn task(&mut self, task: &Task<K, A>) -> CompileResult<()> {
        let run = task
            .run
            .clone()
            .ok_or_else(|| CompileError::MissingTaskRun {
                path: self.path.clone(),
            })?;

        self.emit(Op::Task(CompiledTask {
            name: task.name.clone(),
            start: task.start.clone(),
            run,
            finish: task.finish.clone(),
        }));
        Ok(())
    }

    fn sub_tree(&mut self, tree: Option<&Arc<Tree<K, A>>>) -> CompileResult<()> {
        let tree = tree.ok_or_else(|| CompileError::MissingSubTree {
            path: self.path.clone(),
        })?;
        self.emit(Op::SubTree(tree.clone()));
        Ok(())
    }

    /// Emits a `RepeatStart` / `RepeatCounter` pair and returns the counter's index.
    ///
    /// The loop body must be compiled immediately afterwards.
    fn repeat_header(&mut self, goal: u32) -> usize {
        let counter = self.next_index() + 1;
        self.emit_with(
            Op::RepeatStart { counter },
            Exit::Resolved(counter),
            Exit::Resolved(counter),
        );
        self.emit(Op::RepeatCounter {
            goal,
            body: counter + 1,
        });
        counter
    }

    /// Rewrites every placeholder in `range` that still holds `from`.
    fn patch(&mut self, range: Range<usize>, from: Outcome, to: Exit) {
        self.map_placeholders(range, |outcome| {
            if outcome == from {
                to
            } else {
                Exit::Placeholder(outcome)
            }
        });
    }

    fn map_placeholders(&mut self, range: Range<usize>, f: impl Fn(Outcome) -> Exit) {
        for instruction in &mut self.pending[range] {
            for exit in [&mut instruction.on_success, &mut instruction.on_fail] {
                if let Exit::Placeholder(outcome) = *exit {
                    *exit = f(outcome);
                }
            }
        }
    }

    /// Resolves the remaining placeholders to the terminals and seals the program.
    fn finish(self) -> CompileResult<Program<K, A>> {
        let len = self.pending.len();
        let resolve = |exit: Exit| match exit {
            Exit::Placeholder(Outcome::Success) => len,
            Exit::Placeholder(Outcome::Fail) => len + 1,
            Exit::Resolved(target) => target,
        };

        let mut instructions = Vec::with_capacity(len);
        for (index, pending) in self.pending.into_iter().enumerate() {
            let on_success = resolve(pending.on_success);
            let on_fail = resolve(pending.on_fail);

            let inner: &[usize] = match &pending.op {
                Op::RandomBranch(table) => table,
                Op::RepeatStart { counter } => std::slice::from_ref(counter),
                Op::RepeatCounter { body, .. } => std::slice::from_ref(body),
                _ => &[],
            };
            let out_of_range = [on_success, on_fail]
                .into_iter()
                .find(|&target| target > len + 1)
                .or_else(|| inner.iter().copied().find(|&target| target >= len));
            if let Some(target) = out_of_range {
                return Err(CompileError::JumpOutOfRange { index, target, len });
            }

            instructions.push(Instruction::new(pending.op, on_success, on_fail));
        }

        Ok(Program::from_instructions(instructions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;
    use crate::Status;

    type TestNode = Node<(), ()>;

    fn leaf(name: &str) -> TestNode {
        action(name, |_, _| Ok(Status::Success))
    }

    fn exits(program: &Program<(), ()>) -> Vec<(usize, usize)> {
        program
            .instructions()
            .iter()
            .map(|i| (i.on_success(), i.on_fail()))
            .collect()
    }

    #[test]
    fn leaf_exits_resolve_to_terminals() {
        let program = compile(&leaf("a")).unwrap();
        assert_eq!(exits(&program), vec![(1, 2)]);
    }

    #[test]
    fn sequence_chains_success_forward() {
        let program = compile(&sequence(vec![leaf("a"), leaf("b"), leaf("c")])).unwrap();
        // SUCCESS = 3, FAIL = 4
        assert_eq!(exits(&program), vec![(1, 4), (2, 4), (3, 4)]);
    }

    #[test]
    fn selector_chains_failure_forward() {
        let program = compile(&selector(vec![leaf("a"), leaf("b")])).unwrap();
        assert_eq!(exits(&program), vec![(2, 1), (2, 3)]);
    }

    #[test]
    fn invert_swaps_only_placeholders() {
        let program = compile(&invert(sequence(vec![leaf("a"), leaf("b")]))).unwrap();
        // a's success was resolved by the sequence and must stay on b.
        assert_eq!(exits(&program), vec![(1, 2), (3, 2)]);
    }

    #[test]
    fn succeed_and_fail_fold_outcomes() {
        let program = compile(&succeed(leaf("a"))).unwrap();
        assert_eq!(exits(&program), vec![(1, 1)]);

        let program = compile(&fail(leaf("a"))).unwrap();
        assert_eq!(exits(&program), vec![(2, 2)]);
    }

    #[test]
    fn hanging_decorators_emit_single_instruction() {
        let program = compile(&hanging_succeed::<(), ()>()).unwrap();
        assert!(matches!(program.instructions()[0].op(), Op::HangingSucceed));
        assert_eq!(exits(&program), vec![(1, 2)]);

        let program = compile(&invert(hanging_fail::<(), ()>())).unwrap();
        assert!(matches!(program.instructions()[0].op(), Op::HangingFail));
        assert_eq!(exits(&program), vec![(2, 1)]);
    }

    #[test]
    fn finite_repeat_loops_through_counter() {
        let program = compile(&repeat(leaf("a"), 3)).unwrap();
        let instructions = program.instructions();

        assert!(matches!(instructions[0].op(), Op::RepeatStart { counter: 1 }));
        assert!(matches!(
            instructions[1].op(),
            Op::RepeatCounter { goal: 3, body: 2 }
        ));
        // counter exits to SUCCESS (3); the task loops back to the counter.
        assert_eq!(exits(&program), vec![(1, 1), (3, 4), (1, 1)]);
    }

    #[test]
    fn repeat_break_on_fail_lets_failure_bubble() {
        let program = compile(&repeat_until_fail(leaf("a"), Some(2))).unwrap();
        assert_eq!(exits(&program)[2], (1, 4));
    }

    #[test]
    fn repeat_break_on_fail_still_loops_folded_failures() {
        // Under succeed, the task's failure exit carries a success placeholder,
        // so it loops even though the repeat breaks on failure.
        let program = compile(&repeat_until_fail(succeed(leaf("a")), Some(2))).unwrap();
        assert_eq!(exits(&program)[2], (1, 1));
    }

    #[test]
    fn infinite_repeat_loops_to_child_start() {
        let program = compile(&sequence(vec![leaf("a"), repeat_forever(leaf("b"))])).unwrap();
        assert_eq!(exits(&program), vec![(1, 3), (1, 1)]);

        let program = compile(&repeat(leaf("a"), 0)).unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(exits(&program), vec![(0, 0)]);
    }

    #[test]
    fn while_routes_condition_and_action() {
        let program = compile(&while_loop(leaf("cond"), leaf("act"))).unwrap();
        // cond success -> act, cond fail -> FAIL; act fail -> cond, act success -> SUCCESS
        assert_eq!(exits(&program), vec![(1, 3), (2, 0)]);
    }

    #[test]
    fn counted_while_loops_through_counter() {
        let program = compile(&while_count(leaf("cond"), leaf("act"), 4)).unwrap();
        assert!(matches!(
            program.instructions()[1].op(),
            Op::RepeatCounter { goal: 4, body: 2 }
        ));
        assert_eq!(exits(&program), vec![(1, 1), (4, 5), (3, 5), (4, 1)]);
    }

    #[test]
    fn random_table_repeats_child_starts_by_weight() {
        let program = compile(&random(vec![
            leaf("a").with_weight(2),
            sequence(vec![leaf("b"), leaf("c")]),
            leaf("d").with_weight(3),
        ]))
        .unwrap();

        match program.instructions()[0].op() {
            Op::RandomBranch(table) => assert_eq!(table, &vec![1, 1, 2, 4, 4, 4]),
            other => panic!("expected random branch, got {:?}", other),
        }
    }

    #[test]
    fn every_exit_is_in_range() {
        let tree = selector(vec![
            sequence(vec![
                query("self", "alert", "true"),
                repeat(invert(leaf("a")), 2),
                while_count(leaf("b"), fail(leaf("c")), 3),
            ]),
            random(vec![succeed(leaf("d")), hanging_fail(), leaf("e")]),
            repeat_until_fail(selector(vec![leaf("f"), leaf("g")]), None),
        ]);
        let program = compile(&tree).unwrap();
        let limit = program.fail_index();

        for instruction in program.instructions() {
            assert!(instruction.on_success() <= limit);
            assert!(instruction.on_fail() <= limit);
        }
    }

    #[test]
    fn patch_rewrites_by_value_in_either_field() {
        let mut compiler = Compiler::<(), ()>::new();
        compiler.emit_with(
            Op::HangingSucceed,
            Exit::Placeholder(Outcome::Fail),
            Exit::Placeholder(Outcome::Success),
        );
        compiler.emit_with(
            Op::HangingSucceed,
            Exit::Resolved(0),
            Exit::Placeholder(Outcome::Success),
        );

        compiler.patch(0..2, Outcome::Success, Exit::Resolved(7));

        let fields: Vec<_> = compiler
            .pending
            .iter()
            .map(|p| (p.on_success, p.on_fail))
            .collect();
        assert_eq!(
            fields,
            vec![
                (Exit::Placeholder(Outcome::Fail), Exit::Resolved(7)),
                (Exit::Resolved(0), Exit::Resolved(7)),
            ]
        );
    }

    #[test]
    fn malformed_definitions_are_rejected() {
        let empty = sequence::<(), ()>(vec![]);
        assert!(matches!(
            compile(&empty),
            Err(CompileError::EmptyComposite { kind: "sequence", .. })
        ));

        let no_run = selector(vec![leaf("a"), task(Task::new("missing"))]);
        match compile(&no_run) {
            Err(CompileError::MissingTaskRun { path }) => assert_eq!(path.to_string(), "root.1"),
            other => panic!("unexpected {:?}", other.map(|p| p.len())),
        }

        let unresolved = Node::<(), ()>::new(NodeKind::SubTree(None));
        assert!(matches!(
            compile(&unresolved),
            Err(CompileError::MissingSubTree { .. })
        ));

        let bare_invert = Node::<(), ()>::new(NodeKind::Invert);
        assert!(matches!(
            compile(&bare_invert),
            Err(CompileError::MissingChild { kind: "invert", .. })
        ));

        let crowded = succeed(leaf("a")).with_child(leaf("b"));
        assert!(matches!(
            compile(&crowded),
            Err(CompileError::TooManyChildren { count: 2, .. })
        ));

        let lopsided = Node::new(NodeKind::While { count: None }).with_child(leaf("a"));
        assert!(matches!(
            compile(&lopsided),
            Err(CompileError::WhileArity { count: 1, .. })
        ));

        let parent_leaf = leaf("a").with_child(leaf("b"));
        assert!(matches!(
            compile(&parent_leaf),
            Err(CompileError::LeafWithChildren { kind: "task", .. })
        ));

        let weightless = random(vec![leaf("a").with_weight(0)]);
        assert!(matches!(
            compile(&weightless),
            Err(CompileError::ZeroWeight { .. })
        ));
    }
}
