//! Error types for lifecycle operations

use thiserror::Error;

/// Errors returned by the task lifecycle operations.
///
/// These are always synchronous and never change task state: an operation
/// either applies fully or returns one of these and leaves the task as it was.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// `start` was called on a task that is not paused
    #[error("task is already started or completed")]
    AlreadyStarted,

    /// `pause` was called while the task's coroutine is executing
    #[error("tasks can only be paused while blocked")]
    PauseWhileRunning,

    /// `cancel` was called while the task's coroutine is executing
    #[error("tasks can only be cancelled while blocked")]
    CancelWhileRunning,

    /// `pause` or `cancel` was called on a cancelled or closed task
    #[error("task is already cancelled or completed")]
    AlreadyFinished,
}
