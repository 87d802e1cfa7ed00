//! Task structure, lifecycle state machine, and the resumption step

use crate::coroutine::{Coroutine, Resume, Step};
use crate::error::TaskError;
use crate::promise::Promise;
use crate::runtime::Core;
use crate::scheduler::Scheduler;
use log::{debug, trace};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Unique identifier for a task.
///
/// Monotonically increasing per process, wrapping at 2^32. Used for identity
/// and debugging only; the scheduler compares tasks by pointer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(u32);

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

impl TaskId {
    fn next() -> Self {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        TaskId((id & 0xffff_ffff) as u32)
    }

    /// Get the numeric ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a task.
///
/// Transitions only move forward: Paused ↔ Started while alive, then into
/// Cancelled and/or Closed, never back out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ThreadState {
    /// Not eligible for scheduling; only `start` re-admits it
    Paused,
    /// Admitted; may be ready, blocked, or currently executing
    Started,
    /// Cancelled but not yet cleaned up by the pump
    Cancelled,
    /// Completely done; completion has settled
    Closed,
}

/// Resumption-readiness of a task's coroutine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on a promise
    Blocked,
    /// Ready to resume with a resolved value
    Resolved,
    /// Ready to resume with a rejected error
    Rejected,
    /// Currently executing under the pump
    Running,
}

/// A schedulable unit wrapping one suspendable coroutine.
///
/// Tasks are created paused via [`Runtime::create_task`] and handled as
/// `Arc<Task>`. The coroutine and the completion promise are exclusively
/// owned; the scheduler is captured at creation time and fixed for the
/// task's lifetime.
///
/// [`Runtime::create_task`]: crate::runtime::Runtime::create_task
pub struct Task<V, E> {
    /// Unique identifier
    id: TaskId,

    /// Handle to this task's own Arc, for re-admitting itself
    me: Weak<Task<V, E>>,

    /// Lifecycle state
    thread_state: Mutex<ThreadState>,

    /// Resumption-readiness state
    run_state: Mutex<RunState>,

    /// Outcome of the last wait, consumed by the next resumption step
    result: Mutex<Option<Resume<V, E>>>,

    /// The suspendable computation
    coroutine: Mutex<Box<dyn Coroutine<V, E>>>,

    /// Scheduling policy this task was bound to at creation
    scheduler: Arc<dyn Scheduler<V, E>>,

    /// Runtime core driving this task
    runtime: Arc<Core<V, E>>,

    /// Externally observable result, settled exactly once on close
    completion: Promise<Option<V>, E>,
}

impl<V, E> fmt::Debug for Task<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task({}, {:?}, {:?})",
            self.id,
            *self.thread_state.lock(),
            *self.run_state.lock()
        )
    }
}

impl<V, E> Task<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    /// Create a paused task. The factory runs synchronously and receives a
    /// weak handle to the task under construction.
    pub(crate) fn new<F>(
        runtime: Arc<Core<V, E>>,
        scheduler: Arc<dyn Scheduler<V, E>>,
        factory: F,
    ) -> Arc<Self>
    where
        F: FnOnce(Weak<Task<V, E>>) -> Box<dyn Coroutine<V, E>>,
    {
        Arc::new_cyclic(|weak| Task {
            id: TaskId::next(),
            me: weak.clone(),
            thread_state: Mutex::new(ThreadState::Paused),
            run_state: Mutex::new(RunState::Resolved),
            result: Mutex::new(None),
            coroutine: Mutex::new(factory(weak.clone())),
            scheduler,
            runtime,
            completion: Promise::pending(),
        })
    }

    /// The task's own Arc. Infallible: callers can only reach a task
    /// through an Arc, so a strong reference always exists.
    fn strong(&self) -> Arc<Self> {
        self.me.upgrade().expect("task is reachable through an Arc")
    }

    /// Get the task's unique ID.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current lifecycle state.
    pub fn thread_state(&self) -> ThreadState {
        *self.thread_state.lock()
    }

    /// Current resumption-readiness state.
    pub fn run_state(&self) -> RunState {
        *self.run_state.lock()
    }

    /// Whether the task is admitted for scheduling.
    pub fn is_started(&self) -> bool {
        self.thread_state() == ThreadState::Started
    }

    /// Whether the task's coroutine is executing right now.
    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    /// The scheduling policy this task is bound to.
    pub fn scheduler(&self) -> &Arc<dyn Scheduler<V, E>> {
        &self.scheduler
    }

    /// A handle to the task's completion promise.
    pub fn completion(&self) -> Promise<Option<V>, E> {
        self.completion.clone()
    }

    /// Attach a continuation to the task's completion, delivered exactly once.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce(Result<Option<V>, E>) + 'static,
    {
        self.completion.subscribe(f);
    }

    /// The final result, if the task has closed.
    pub fn try_result(&self) -> Option<Result<Option<V>, E>> {
        self.completion.try_get()
    }

    /// Admit the task for scheduling.
    ///
    /// Fails unless the task is paused. If the coroutine is not blocked on a
    /// promise the task enters its scheduler's ready set and the pump is
    /// triggered; actual progress happens on a later tick, never inside this
    /// call.
    pub fn start(&self) -> Result<(), TaskError> {
        {
            let mut state = self.thread_state.lock();
            if *state != ThreadState::Paused {
                return Err(TaskError::AlreadyStarted);
            }
            *state = ThreadState::Started;
        }
        trace!("task {} started", self.id);
        if self.run_state() != RunState::Blocked {
            self.scheduler.schedule(self.strong());
            Core::pump(&self.runtime, &self.scheduler);
        }
        Ok(())
    }

    /// Remove the task from scheduling until the next `start`.
    ///
    /// Fails if the coroutine is executing right now, or if the task is
    /// already cancelled or closed. A paused task that was blocked still
    /// records its awaited outcome when the promise settles; `start` later
    /// re-admits it with that outcome.
    pub fn pause(&self) -> Result<(), TaskError> {
        if self.run_state() == RunState::Running {
            return Err(TaskError::PauseWhileRunning);
        }
        {
            let mut state = self.thread_state.lock();
            match *state {
                ThreadState::Cancelled | ThreadState::Closed => {
                    return Err(TaskError::AlreadyFinished)
                }
                _ => *state = ThreadState::Paused,
            }
        }
        trace!("task {} paused", self.id);
        self.scheduler.unschedule(self);
        Ok(())
    }

    /// Cancel the task.
    ///
    /// Fails if the coroutine is executing right now, or if the task is
    /// already cancelled or closed. The task is forced into the ready set;
    /// on its next scheduling step the coroutine is not resumed and the task
    /// closes with `Ok(None)`.
    pub fn cancel(&self) -> Result<(), TaskError> {
        if self.run_state() == RunState::Running {
            return Err(TaskError::CancelWhileRunning);
        }
        {
            let mut state = self.thread_state.lock();
            match *state {
                ThreadState::Cancelled | ThreadState::Closed => {
                    return Err(TaskError::AlreadyFinished)
                }
                _ => *state = ThreadState::Cancelled,
            }
        }
        trace!("task {} cancelled", self.id);
        // The task may already sit in the ready set; re-admit it exactly once.
        self.scheduler.unschedule(self);
        self.scheduler.schedule(self.strong());
        Core::pump(&self.runtime, &self.scheduler);
        Ok(())
    }

    /// Execute one resumption step. Called only by the pump, with this task
    /// marked as the process's running task.
    pub(crate) fn run_step(&self) {
        let input = self.result.lock().take().unwrap_or(Ok(None));
        *self.run_state.lock() = RunState::Running;

        let cancelled = {
            let mut state = self.thread_state.lock();
            if *state == ThreadState::Cancelled {
                *state = ThreadState::Closed;
                true
            } else {
                false
            }
        };
        if cancelled {
            *self.run_state.lock() = RunState::Resolved;
            debug!("task {} closed (cancelled)", self.id);
            self.completion.resolve(None);
            return;
        }

        trace!("task {} resuming", self.id);
        let step = self.coroutine.lock().resume(input);
        match step {
            Step::Await(promise) => {
                *self.run_state.lock() = RunState::Blocked;
                let task = self.strong();
                promise.subscribe(move |outcome| task.deliver(outcome.map(Some)));
            }
            Step::Yield => {
                *self.run_state.lock() = RunState::Blocked;
                self.deliver(Ok(None));
            }
            Step::Done(value) => {
                *self.thread_state.lock() = ThreadState::Closed;
                *self.run_state.lock() = RunState::Resolved;
                debug!("task {} closed (done)", self.id);
                self.completion.resolve(value);
            }
            Step::Fail(error) => {
                *self.thread_state.lock() = ThreadState::Closed;
                *self.run_state.lock() = RunState::Rejected;
                debug!("task {} closed (failed)", self.id);
                self.completion.reject(error);
            }
        }
    }

    /// Record the outcome of a wait and re-admit the task if still started.
    ///
    /// Pause and cancel own their transitions: a task that moved out of
    /// Started while blocked keeps the outcome but is not re-admitted here.
    fn deliver(&self, outcome: Resume<V, E>) {
        *self.run_state.lock() = if outcome.is_ok() {
            RunState::Resolved
        } else {
            RunState::Rejected
        };
        *self.result.lock() = Some(outcome);
        if self.thread_state() == ThreadState::Started {
            self.scheduler.schedule(self.strong());
            Core::pump(&self.runtime, &self.scheduler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::step_fn;
    use crate::runtime::Runtime;

    fn never_task(rt: &Runtime<i32, String>) -> Arc<Task<i32, String>> {
        rt.create_task(|_| Box::new(step_fn(|_input| Step::Await(Promise::pending()))))
    }

    #[test]
    fn test_task_id_uniqueness() {
        let rt: Runtime<i32, String> = Runtime::new();
        let t1 = never_task(&rt);
        let t2 = never_task(&rt);
        assert_ne!(t1.id(), t2.id());
    }

    #[test]
    fn test_task_initial_state() {
        let rt: Runtime<i32, String> = Runtime::new();
        let task = never_task(&rt);

        assert_eq!(task.thread_state(), ThreadState::Paused);
        assert_eq!(task.run_state(), RunState::Resolved);
        assert!(!task.is_started());
        assert!(!task.is_running());
        assert!(task.try_result().is_none());
    }

    #[test]
    fn test_start_twice_fails() {
        let rt: Runtime<i32, String> = Runtime::new();
        let task = never_task(&rt);

        task.start().unwrap();
        assert!(task.is_started());
        assert_eq!(task.start(), Err(TaskError::AlreadyStarted));
    }

    #[test]
    fn test_pause_then_restart() {
        let rt: Runtime<i32, String> = Runtime::new();
        let task = never_task(&rt);

        task.start().unwrap();
        task.pause().unwrap();
        assert!(!task.is_started());

        task.start().unwrap();
        assert!(task.is_started());
    }

    #[test]
    fn test_pause_before_start_is_allowed() {
        let rt: Runtime<i32, String> = Runtime::new();
        let task = never_task(&rt);

        task.pause().unwrap();
        assert_eq!(task.thread_state(), ThreadState::Paused);
    }

    #[test]
    fn test_cancel_then_lifecycle_calls_fail() {
        let rt: Runtime<i32, String> = Runtime::new();
        let task = never_task(&rt);

        task.cancel().unwrap();
        assert_eq!(task.thread_state(), ThreadState::Cancelled);

        assert_eq!(task.start(), Err(TaskError::AlreadyStarted));
        assert_eq!(task.pause(), Err(TaskError::AlreadyFinished));
        assert_eq!(task.cancel(), Err(TaskError::AlreadyFinished));
    }

    #[test]
    fn test_cancel_closes_on_next_drain() {
        let rt: Runtime<i32, String> = Runtime::new();
        let task = never_task(&rt);

        task.cancel().unwrap();
        rt.run_until_idle();

        assert_eq!(task.thread_state(), ThreadState::Closed);
        assert_eq!(task.try_result(), Some(Ok(None)));
    }

    #[test]
    fn test_failed_lifecycle_call_changes_nothing() {
        let rt: Runtime<i32, String> = Runtime::new();
        let task = never_task(&rt);

        task.start().unwrap();
        let before = (task.thread_state(), task.run_state());
        assert!(task.start().is_err());
        assert_eq!((task.thread_state(), task.run_state()), before);
    }

    #[test]
    fn test_debug_format() {
        let rt: Runtime<i32, String> = Runtime::new();
        let task = never_task(&rt);

        let rendered = format!("{:?}", task);
        assert!(rendered.starts_with("Task("));
        assert!(rendered.contains("Paused"));
    }
}
