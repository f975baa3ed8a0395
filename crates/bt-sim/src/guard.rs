//! Guard behavior driven by the simulation.
//!
//! A guard answers the squad alarm first, rests when tired, and otherwise
//! walks a patrol delegated to a shared sub-tree, tiring every third lap.

use std::sync::Arc;

use behavior_tree::builder::{
    action, hanging_succeed, query, random, repeat, selector, sequence, subtree, task,
};
use behavior_tree::{
    Behavior, BoardRegistry, Node, Status, Task, TaskContext, TaskError, TaskResult, Tree, Value,
};

pub type GuardId = u32;

pub type GuardNode = Node<GuardId, World>;

/// Name of the board shared by the whole squad.
pub const SQUAD: &str = "squad";
/// Squad board key raised by the simulation and cleared by responders.
pub const ALARM: &str = "alarm";

const TIRED: &str = "tired";
const WALKING: &str = "walking";
const PATROLS: &str = "patrols";
const RESPONSE_LEFT: &str = "response_left";

/// Tick arguments handed to every guard task.
#[derive(Debug)]
pub struct World {
    pub round: u32,
    pub squad: BoardRegistry,
}

/// Guard definition; `patrol` is the compiled tree from [`patrol`].
pub fn guard(patrol: Arc<Tree<GuardId, World>>) -> GuardNode {
    selector(vec![
        sequence(vec![
            query(SQUAD, ALARM, "true"),
            task(Task::from_behavior("respond", Respond { rounds: 2 })),
        ]),
        sequence(vec![query("self", TIRED, "true"), action("rest", rest)]),
        sequence(vec![subtree(patrol), action("tally", tally)]),
    ])
}

/// Patrol definition: pick a route, walk it, then scan twice.
///
/// The patrol tree keeps its own per-guard blackboard, so lap bookkeeping
/// that the guard queries stays in [`guard`].
pub fn patrol() -> GuardNode {
    sequence(vec![
        random(vec![
            walk("north").with_weight(3),
            walk("south").with_weight(3),
            hanging_succeed().with_weight(1),
        ]),
        repeat(action("scan", scan), 2),
    ])
}

/// Walking takes one round: suspend on entry, arrive on the next tick.
///
/// An interrupted walk forgets its route so the next patrol starts fresh.
fn walk(route: &'static str) -> GuardNode {
    task(
        Task::new(format!("walk_{route}"))
            .on_run(
                move |ctx: &mut TaskContext<'_, GuardId>, world: &mut World| {
                    if ctx.blackboard.remove(WALKING).is_some() {
                        tracing::debug!(guard = *ctx.agent, round = world.round, route, "arrived");
                        Ok(Status::Success)
                    } else {
                        ctx.blackboard.set(WALKING, route);
                        Ok(Status::Running)
                    }
                },
            )
            .on_finish(|ctx, _status, _world| {
                ctx.blackboard.remove(WALKING);
            }),
    )
}

fn scan(ctx: &mut TaskContext<'_, GuardId>, world: &mut World) -> TaskResult {
    tracing::trace!(guard = *ctx.agent, round = world.round, "scanning");
    Ok(Status::Success)
}

fn tally(ctx: &mut TaskContext<'_, GuardId>, _world: &mut World) -> TaskResult {
    let patrols = match ctx.blackboard.get(PATROLS) {
        Some(Value::Int(n)) => *n + 1,
        _ => 1,
    };
    ctx.blackboard.set(PATROLS, patrols);
    if patrols % 3 == 0 {
        ctx.blackboard.set(TIRED, true);
    }
    Ok(Status::Success)
}

fn rest(ctx: &mut TaskContext<'_, GuardId>, world: &mut World) -> TaskResult {
    ctx.blackboard.set(TIRED, false);
    tracing::debug!(guard = *ctx.agent, round = world.round, "rested");
    Ok(Status::Success)
}

/// Holds position for `rounds` ticks, then stands the squad down.
struct Respond {
    rounds: i64,
}

impl Behavior<GuardId, World> for Respond {
    fn start(&self, ctx: &mut TaskContext<'_, GuardId>, world: &mut World) {
        ctx.blackboard.set(RESPONSE_LEFT, self.rounds);
        tracing::info!(guard = *ctx.agent, round = world.round, "responding to alarm");
    }

    fn run(&self, ctx: &mut TaskContext<'_, GuardId>, _world: &mut World) -> TaskResult {
        let left = match ctx.blackboard.get(RESPONSE_LEFT) {
            Some(Value::Int(n)) => *n,
            _ => return Err(TaskError::msg("response was never started")),
        };

        if left > 1 {
            ctx.blackboard.set(RESPONSE_LEFT, left - 1);
            Ok(Status::Running)
        } else {
            ctx.blackboard.remove(RESPONSE_LEFT);
            Ok(Status::Success)
        }
    }

    fn finish(&self, ctx: &mut TaskContext<'_, GuardId>, status: Status, world: &mut World) {
        if status.is_success() {
            match world.squad.update(SQUAD, |board| board.set(ALARM, false)) {
                Ok(_) => tracing::info!(guard = *ctx.agent, round = world.round, "alarm cleared"),
                Err(err) => tracing::warn!(guard = *ctx.agent, error = %err, "could not clear alarm"),
            }
        } else {
            ctx.blackboard.remove(RESPONSE_LEFT);
            tracing::debug!(guard = *ctx.agent, round = world.round, "response interrupted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use behavior_tree::Blackboard;

    fn squad(alarm: bool) -> BoardRegistry {
        let registry = BoardRegistry::new();
        let mut board = Blackboard::new();
        board.set(ALARM, alarm);
        registry.register(SQUAD, board).unwrap();
        registry
    }

    fn guard_tree(registry: &BoardRegistry) -> Tree<GuardId, World> {
        let patrol = Arc::new(Tree::builder(&patrol()).seed(5).build().unwrap());
        Tree::builder(&guard(patrol))
            .seed(5)
            .boards(registry.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn responder_clears_alarm() {
        let registry = squad(true);
        let tree = guard_tree(&registry);
        let mut world = World {
            round: 0,
            squad: registry.clone(),
        };

        assert_eq!(tree.run(&0, &mut world).unwrap(), Status::Running);
        assert_eq!(tree.run(&0, &mut world).unwrap(), Status::Success);

        let alarm = registry
            .read(SQUAD, |board| board.get(ALARM).cloned())
            .unwrap();
        assert_eq!(alarm, Some(Some(Value::Bool(false))));
    }

    #[test]
    fn interrupted_walk_forgets_route() {
        let tree: Tree<GuardId, World> = Tree::builder(&walk("north")).build().unwrap();
        let mut world = World {
            round: 0,
            squad: squad(false),
        };

        assert_eq!(tree.run(&0, &mut world).unwrap(), Status::Running);
        assert!(tree.blackboard(&0).unwrap().contains(WALKING));

        tree.abort(&0, &mut world);
        assert!(!tree.blackboard(&0).unwrap().contains(WALKING));

        // A fresh walk suspends again instead of arriving at once.
        assert_eq!(tree.run(&0, &mut world).unwrap(), Status::Running);
    }

    #[test]
    fn quiet_guard_patrols_until_tired() {
        let registry = squad(false);
        let tree = guard_tree(&registry);
        let mut world = World {
            round: 0,
            squad: registry,
        };

        for round in 0..12 {
            world.round = round;
            tree.run(&0, &mut world).unwrap();
        }

        let board = tree.blackboard(&0).unwrap();
        assert!(matches!(board.get(PATROLS), Some(Value::Int(n)) if *n >= 3));
    }
}
