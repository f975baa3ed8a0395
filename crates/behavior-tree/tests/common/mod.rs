#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use behavior_tree::builder::task;
use behavior_tree::{Node, Status, Task};

pub type TestNode = Node<u32, ()>;

/// Shared, ordered record of task hook invocations.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.0.lock().expect("journal lock").push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn clear(&self) {
        self.0.lock().expect("journal lock").clear();
    }
}

/// Task that reports `script` in order, repeating the last status forever.
///
/// Every hook call is written to `journal` as `start:name`, `run:name` or
/// `finish:name:Status`.
pub fn scripted(name: &str, journal: &Journal, script: &[Status]) -> TestNode {
    assert!(!script.is_empty(), "script needs at least one status");

    let calls = Arc::new(AtomicUsize::new(0));
    let script = script.to_vec();
    let (on_start, on_run, on_finish) = (journal.clone(), journal.clone(), journal.clone());
    let (start_name, run_name, finish_name) = (name.to_owned(), name.to_owned(), name.to_owned());

    task(
        Task::new(name)
            .on_start(move |_, _| on_start.push(format!("start:{start_name}")))
            .on_run(move |_, _| {
                on_run.push(format!("run:{run_name}"));
                let call = calls.fetch_add(1, Ordering::SeqCst);
                Ok(script[call.min(script.len() - 1)])
            })
            .on_finish(move |_, status, _| {
                on_finish.push(format!("finish:{finish_name}:{status:?}"))
            }),
    )
}

pub fn succeeding(name: &str, journal: &Journal) -> TestNode {
    scripted(name, journal, &[Status::Success])
}

pub fn failing(name: &str, journal: &Journal) -> TestNode {
    scripted(name, journal, &[Status::Failure])
}
