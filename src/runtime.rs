//! The execution pump and scheduler registry
//!
//! A [`Runtime`] multiplexes tasks onto one logical executor. The pump picks
//! a ready task from a scheduler and defers its resumption to a tick queue;
//! [`Runtime::run_until_idle`] drains that queue one step at a time, so at
//! most one coroutine is ever mid-resume and the call stack stays flat no
//! matter how many steps chain together.

use crate::coroutine::Coroutine;
use crate::error::TaskError;
use crate::scheduler::{RandomScheduler, Scheduler};
use crate::task::Task;
use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

type Tick = Box<dyn FnOnce()>;

/// Shared state behind a [`Runtime`] handle.
pub(crate) struct Core<V, E> {
    /// Currently installed scheduler; captured by tasks at creation
    scheduler: Mutex<Arc<dyn Scheduler<V, E>>>,

    /// The task currently mid-resumption, if any
    running: Mutex<Option<Arc<Task<V, E>>>>,

    /// Deferred resumption steps, in arrival order
    ticks: Mutex<VecDeque<Tick>>,

    /// Set while `run_until_idle` is draining the tick queue
    draining: Cell<bool>,
}

impl<V, E> Core<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    /// Pick a ready task from `scheduler` and queue one resumption step.
    ///
    /// Returns without queueing anything if a task is already running (the
    /// queued step will pump again when it finishes) or the scheduler has
    /// nothing ready. The resumption itself never runs on the caller's
    /// stack.
    pub(crate) fn pump(core: &Arc<Self>, scheduler: &Arc<dyn Scheduler<V, E>>) {
        if core.running.lock().is_some() {
            return;
        }
        let Some(task) = scheduler.choose() else {
            return;
        };
        let tick: Tick = Box::new({
            let core = core.clone();
            let scheduler = scheduler.clone();
            move || {
                *core.running.lock() = Some(task.clone());
                task.run_step();
                *core.running.lock() = None;
                Core::pump(&core, &scheduler);
            }
        });
        core.ticks.lock().push_back(tick);
    }
}

/// A single logical executor: scheduler registry, running-task marker, and
/// the tick queue the pump defers resumptions to.
///
/// `Runtime` is a cheap handle; clones drive the same executor. Concurrency
/// under a runtime is interleaving, not parallelism: nothing makes progress
/// except inside [`Runtime::run_until_idle`], and exactly zero or one task
/// is mid-resumption at any instant.
pub struct Runtime<V, E> {
    core: Arc<Core<V, E>>,
}

impl<V, E> Clone for Runtime<V, E> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<V, E> Default for Runtime<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> Runtime<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    /// Create a runtime with a fresh [`RandomScheduler`] installed.
    pub fn new() -> Self {
        Self::with_scheduler(Arc::new(RandomScheduler::new()))
    }

    /// Create a runtime with the given scheduler installed.
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler<V, E>>) -> Self {
        Self {
            core: Arc::new(Core {
                scheduler: Mutex::new(scheduler),
                running: Mutex::new(None),
                ticks: Mutex::new(VecDeque::new()),
                draining: Cell::new(false),
            }),
        }
    }

    /// The currently installed scheduler.
    pub fn current_scheduler(&self) -> Arc<dyn Scheduler<V, E>> {
        self.core.scheduler.lock().clone()
    }

    /// Replace the installed scheduler.
    ///
    /// Tasks capture their scheduler at creation time; already created
    /// tasks keep the one they were bound to.
    pub fn set_current_scheduler(&self, scheduler: Arc<dyn Scheduler<V, E>>) {
        *self.core.scheduler.lock() = scheduler;
    }

    /// The task whose coroutine is executing right now, if any.
    pub fn current_task(&self) -> Option<Arc<Task<V, E>>> {
        self.core.running.lock().clone()
    }

    /// Create a paused task bound to the currently installed scheduler.
    ///
    /// The factory runs synchronously and receives a weak handle to the
    /// task under construction; it must return without suspending.
    pub fn create_task<F>(&self, factory: F) -> Arc<Task<V, E>>
    where
        F: FnOnce(Weak<Task<V, E>>) -> Box<dyn Coroutine<V, E>>,
    {
        let scheduler = self.current_scheduler();
        Task::new(self.core.clone(), scheduler, factory)
    }

    /// Create and immediately start a task.
    pub fn spawn<F>(&self, factory: F) -> Result<Arc<Task<V, E>>, TaskError>
    where
        F: FnOnce(Weak<Task<V, E>>) -> Box<dyn Coroutine<V, E>>,
    {
        let task = self.create_task(factory);
        task.start()?;
        Ok(task)
    }

    /// Drain the tick queue until no deferred step remains.
    ///
    /// Each queued step resumes one task and may queue further steps; the
    /// loop runs them in arrival order until the queue is empty. Tasks left
    /// blocked on unsettled promises stay blocked; settling such a promise
    /// afterwards queues new steps, picked up by the next call. Reentrant
    /// calls from inside a running coroutine return immediately.
    pub fn run_until_idle(&self) {
        if self.core.draining.replace(true) {
            return;
        }
        loop {
            let tick = self.core.ticks.lock().pop_front();
            match tick {
                Some(tick) => tick(),
                None => break,
            }
        }
        self.core.draining.set(false);
    }

    /// Whether any deferred step is queued.
    pub fn has_pending_work(&self) -> bool {
        !self.core.ticks.lock().is_empty()
    }
}
