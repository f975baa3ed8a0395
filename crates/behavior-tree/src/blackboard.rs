//! Blackboards and the predicates queried against them.
//!
//! Every agent owns a private [`Blackboard`] created on its first tick.
//! Trees may additionally consult named shared boards held in a
//! [`BoardRegistry`], which is populated by the embedding application.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{RunError, RunResult};

/// A value stored on a blackboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Mutable key-value store consulted by blackboard queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blackboard {
    entries: HashMap<String, Value>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Named shared blackboards, registered by the embedding application.
///
/// Cloning the registry clones the handle; all clones see the same boards.
/// A poisoned registry lock surfaces as [`RunError::LockPoisoned`] rather
/// than as a missing board.
#[derive(Debug, Clone, Default)]
pub struct BoardRegistry {
    boards: Arc<RwLock<HashMap<String, Blackboard>>>,
}

impl BoardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `board` under `name`, returning the board it replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        board: Blackboard,
    ) -> RunResult<Option<Blackboard>> {
        let mut boards = self.boards.write().map_err(|_| RunError::LockPoisoned)?;
        Ok(boards.insert(name.into(), board))
    }

    pub fn unregister(&self, name: &str) -> RunResult<Option<Blackboard>> {
        let mut boards = self.boards.write().map_err(|_| RunError::LockPoisoned)?;
        Ok(boards.remove(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.boards
            .read()
            .map(|boards| boards.contains_key(name))
            .unwrap_or(false)
    }

    /// Runs `f` against the named board; `Ok(None)` if it is not registered.
    pub fn read<R>(&self, name: &str, f: impl FnOnce(&Blackboard) -> R) -> RunResult<Option<R>> {
        let boards = self.boards.read().map_err(|_| RunError::LockPoisoned)?;
        Ok(boards.get(name).map(f))
    }

    /// Runs `f` against the named board mutably; `Ok(None)` if it is not registered.
    pub fn update<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Blackboard) -> R,
    ) -> RunResult<Option<R>> {
        let mut boards = self.boards.write().map_err(|_| RunError::LockPoisoned)?;
        Ok(boards.get_mut(name).map(f))
    }
}

/// Which board a query reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoardRef {
    /// The ticking agent's own blackboard.
    Own,
    /// A shared board looked up in the tree's [`BoardRegistry`].
    Shared(String),
}

impl BoardRef {
    /// Board name used in definitions to denote the agent's own board.
    pub const SELF: &'static str = "self";

    pub fn parse(name: &str) -> Self {
        if name == Self::SELF {
            BoardRef::Own
        } else {
            BoardRef::Shared(name.to_owned())
        }
    }
}

impl fmt::Display for BoardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardRef::Own => f.write_str(Self::SELF),
            BoardRef::Shared(name) => f.write_str(name),
        }
    }
}

/// Test applied to a blackboard entry.
///
/// Parsed from the authoring vocabulary: `true`, `false`, `unset` (or `nil`),
/// `set` (or `notnil`); any other string is an equality test against that
/// literal.
#[derive(Debug, Clone, PartialEq, Eq, strum::EnumString)]
pub enum Predicate {
    #[strum(serialize = "true")]
    IsTrue,
    #[strum(serialize = "false")]
    IsFalse,
    #[strum(serialize = "unset", serialize = "nil")]
    IsUnset,
    #[strum(serialize = "set", serialize = "notnil")]
    IsSet,
    #[strum(default)]
    Equals(String),
}

impl Predicate {
    pub fn parse(source: &str) -> Self {
        source
            .parse()
            .unwrap_or_else(|_| Predicate::Equals(source.to_owned()))
    }

    pub fn test(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::IsTrue => matches!(value, Some(Value::Bool(true))),
            Predicate::IsFalse => matches!(value, Some(Value::Bool(false))),
            Predicate::IsUnset => value.is_none(),
            Predicate::IsSet => value.is_some(),
            Predicate::Equals(expected) => {
                matches!(value, Some(Value::Text(text)) if text == expected)
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::IsTrue => f.write_str("true"),
            Predicate::IsFalse => f.write_str("false"),
            Predicate::IsUnset => f.write_str("unset"),
            Predicate::IsSet => f.write_str("set"),
            Predicate::Equals(expected) => write!(f, "== {:?}", expected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_vocabulary() {
        assert_eq!(Predicate::parse("true"), Predicate::IsTrue);
        assert_eq!(Predicate::parse("false"), Predicate::IsFalse);
        assert_eq!(Predicate::parse("nil"), Predicate::IsUnset);
        assert_eq!(Predicate::parse("unset"), Predicate::IsUnset);
        assert_eq!(Predicate::parse("notnil"), Predicate::IsSet);
        assert_eq!(
            Predicate::parse("hunting"),
            Predicate::Equals("hunting".to_owned())
        );
    }

    #[test]
    fn bool_predicates_require_exact_bools() {
        let text = Value::from("true");
        assert!(!Predicate::IsTrue.test(Some(&text)));
        assert!(Predicate::IsTrue.test(Some(&Value::Bool(true))));
        assert!(!Predicate::IsFalse.test(None));
        assert!(Predicate::IsFalse.test(Some(&Value::Bool(false))));
    }

    #[test]
    fn equality_only_matches_text() {
        let wanted = Predicate::parse("7");
        assert!(!wanted.test(Some(&Value::Int(7))));
        assert!(wanted.test(Some(&Value::from("7"))));
    }

    #[test]
    fn registry_clones_share_boards() {
        let registry = BoardRegistry::new();
        let other = registry.clone();
        assert!(registry.register("team", Blackboard::new()).unwrap().is_none());

        other
            .update("team", |board| board.set("alert", true))
            .unwrap();
        let alert = registry
            .read("team", |board| board.get("alert").cloned())
            .unwrap();
        assert_eq!(alert, Some(Some(Value::Bool(true))));

        assert!(registry.unregister("team").unwrap().is_some());
        assert!(!other.contains("team"));
        assert_eq!(other.read("team", |_| ()).unwrap(), None);
    }

    #[test]
    fn poisoned_registry_reports_lock_poisoned() {
        let registry = BoardRegistry::new();
        registry.register("team", Blackboard::new()).unwrap();

        let writer = registry.clone();
        let outcome: std::thread::Result<RunResult<Option<()>>> =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                writer.update("team", |_| panic!("writer died holding the lock"))
            }));
        assert!(outcome.is_err());

        assert!(matches!(
            registry.register("other", Blackboard::new()),
            Err(RunError::LockPoisoned)
        ));
        assert!(matches!(
            registry.read("team", |_| ()),
            Err(RunError::LockPoisoned)
        ));
        assert!(matches!(
            registry.unregister("team"),
            Err(RunError::LockPoisoned)
        ));
        assert!(!registry.contains("team"));
    }

    #[test]
    fn blackboard_snapshot_is_plain_json() {
        let mut board = Blackboard::new();
        board.set("hp", 12);
        board.set("mode", "patrol");

        let json = serde_json::to_value(&board).expect("serialize");
        assert_eq!(json["hp"], 12);
        assert_eq!(json["mode"], "patrol");

        let back: Blackboard = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, board);
    }

    #[test]
    fn board_ref_self_is_own() {
        assert_eq!(BoardRef::parse("self"), BoardRef::Own);
        assert_eq!(
            BoardRef::parse("squad"),
            BoardRef::Shared("squad".to_owned())
        );
    }
}
