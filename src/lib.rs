//! Cooperative task scheduler with pluggable, randomizable policies.
//!
//! Turns suspendable computations ([`Coroutine`]s) into schedulable units
//! ([`Task`]s) multiplexed onto a single logical executor ([`Runtime`]),
//! driven by a pluggable [`Scheduler`] policy. The reference policy,
//! [`RandomScheduler`], picks a uniformly random ready task each step so
//! that repeated runs of the same concurrent program exercise different
//! legal interleavings, surfacing orderings a fixed scheduler would never
//! reach.
//!
//! Concurrency here is interleaving, not parallelism: at most one task is
//! computing at any instant, suspension happens only where a coroutine
//! awaits a [`Promise`], and resumption happens only through the runtime's
//! pump.
//!
//! # Example
//!
//! ```
//! use cotask::{step_fn, Promise, Runtime, Step};
//!
//! let rt: Runtime<i32, String> = Runtime::new();
//! let gate: Promise<i32, String> = Promise::pending();
//!
//! let gate2 = gate.clone();
//! let task = rt
//!     .spawn(move |_| {
//!         let mut awaited = false;
//!         Box::new(step_fn(move |input| {
//!             if !awaited {
//!                 awaited = true;
//!                 Step::Await(gate2.clone())
//!             } else {
//!                 let value = input.unwrap().unwrap_or(0);
//!                 Step::Done(Some(value * 2))
//!             }
//!         }))
//!     })
//!     .unwrap();
//!
//! rt.run_until_idle();
//! gate.resolve(21);
//! rt.run_until_idle();
//!
//! assert_eq!(task.try_result(), Some(Ok(Some(42))));
//! ```

#![warn(missing_docs)]

mod coroutine;
mod error;
mod promise;
mod runtime;
mod scheduler;
mod task;

pub use coroutine::{step_fn, Coroutine, Resume, Step, StepFn};
pub use error::TaskError;
pub use promise::Promise;
pub use runtime::Runtime;
pub use scheduler::{FifoScheduler, RandomScheduler, Scheduler};
pub use task::{RunState, Task, TaskId, ThreadState};
