//! Scheduling policies
//!
//! A scheduler is a pure ready-queue policy: the pump asks it to choose the
//! next task, lifecycle operations add and remove tasks. No ordering is
//! promised to callers beyond "some ready task, chosen by policy".

use crate::task::Task;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;

/// A pluggable ready-queue policy.
///
/// Callers keep membership unique: the pump and the lifecycle operations
/// never schedule a task that is already in the ready set.
pub trait Scheduler<V, E> {
    /// Remove and return one ready task, or `None` if the set is empty.
    fn choose(&self) -> Option<Arc<Task<V, E>>>;

    /// Add a task to the ready set.
    fn schedule(&self, task: Arc<Task<V, E>>);

    /// Remove a task from the ready set if present; no-op otherwise.
    fn unschedule(&self, task: &Task<V, E>);
}

/// Reference policy: picks a uniformly random ready task each step.
///
/// Repeated runs of the same concurrent program then exercise different
/// legal interleavings, surfacing ordering bugs a fixed policy would
/// never reach. Use [`RandomScheduler::with_seed`] to replay one
/// interleaving deterministically.
pub struct RandomScheduler<V, E> {
    ready: Mutex<Vec<Arc<Task<V, E>>>>,
    rng: Mutex<StdRng>,
}

impl<V, E> RandomScheduler<V, E> {
    /// Create a scheduler seeded from system entropy.
    pub fn new() -> Self {
        Self {
            ready: Mutex::new(Vec::new()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a scheduler with a fixed seed for reproducible interleavings.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            ready: Mutex::new(Vec::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Number of currently ready tasks.
    pub fn len(&self) -> usize {
        self.ready.lock().len()
    }

    /// Whether the ready set is empty.
    pub fn is_empty(&self) -> bool {
        self.ready.lock().is_empty()
    }
}

impl<V, E> Default for RandomScheduler<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> Scheduler<V, E> for RandomScheduler<V, E> {
    fn choose(&self) -> Option<Arc<Task<V, E>>> {
        let mut ready = self.ready.lock();
        match ready.len() {
            0 => None,
            1 => ready.pop(),
            n => {
                let i = self.rng.lock().gen_range(0..n);
                Some(ready.remove(i))
            }
        }
    }

    fn schedule(&self, task: Arc<Task<V, E>>) {
        self.ready.lock().push(task);
    }

    fn unschedule(&self, task: &Task<V, E>) {
        let mut ready = self.ready.lock();
        if let Some(i) = ready
            .iter()
            .position(|t| std::ptr::eq(Arc::as_ptr(t), task))
        {
            ready.remove(i);
        }
    }
}

/// Deterministic first-in-first-out policy.
///
/// Useful as a baseline when an interleaving bug found under
/// [`RandomScheduler`] needs a stable reproduction.
pub struct FifoScheduler<V, E> {
    ready: Mutex<VecDeque<Arc<Task<V, E>>>>,
}

impl<V, E> FifoScheduler<V, E> {
    /// Create an empty FIFO scheduler.
    pub fn new() -> Self {
        Self {
            ready: Mutex::new(VecDeque::new()),
        }
    }

    /// Number of currently ready tasks.
    pub fn len(&self) -> usize {
        self.ready.lock().len()
    }

    /// Whether the ready set is empty.
    pub fn is_empty(&self) -> bool {
        self.ready.lock().is_empty()
    }
}

impl<V, E> Default for FifoScheduler<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> Scheduler<V, E> for FifoScheduler<V, E> {
    fn choose(&self) -> Option<Arc<Task<V, E>>> {
        self.ready.lock().pop_front()
    }

    fn schedule(&self, task: Arc<Task<V, E>>) {
        self.ready.lock().push_back(task);
    }

    fn unschedule(&self, task: &Task<V, E>) {
        self.ready
            .lock()
            .retain(|t| !std::ptr::eq(Arc::as_ptr(t), task));
    }
}
