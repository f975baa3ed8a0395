//! Status returned by tasks, sub-trees and whole tree ticks.

/// The result of ticking a task or a tree for one agent.
///
/// # Suspension Semantics
///
/// A tick may end before the tree concludes:
/// - Conditions and instantaneous actions finish within the tick
/// - Long-running actions report `Running` and are resumed on the next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The behavior completed successfully.
    ///
    /// For conditions: The condition was met.
    /// For actions: The action executed without errors.
    Success,

    /// The behavior failed.
    ///
    /// For conditions: The condition was not met.
    /// For actions: The action could not be executed.
    Failure,

    /// The behavior has not finished yet.
    ///
    /// The agent's cursor stays on the suspended instruction and the next
    /// tick resumes it without calling `start` again.
    Running,
}

impl Status {
    /// Returns `true` if this status is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Returns `true` if this status is `Failure`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    /// Returns `true` if this status is `Running`.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    /// Returns `true` once the behavior has concluded either way.
    #[inline]
    pub fn is_done(self) -> bool {
        !self.is_running()
    }

    /// Inverts the status: Success becomes Failure and vice versa.
    ///
    /// `Running` is left untouched.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            Status::Running => Status::Running,
        }
    }
}
