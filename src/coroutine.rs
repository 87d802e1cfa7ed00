//! The suspendable-computation contract
//!
//! A coroutine is a resumable state machine driven by the pump. Each resume
//! feeds in the outcome of the previous wait and gets back one [`Step`]:
//! suspend on a promise, yield, or finish. Finishing is an explicit variant,
//! not an exception channel, so there is no distinguished error to catch.

use crate::promise::Promise;

/// What the previous wait produced, fed into the next resume.
///
/// The first resume of a task receives `Ok(None)`.
pub type Resume<V, E> = Result<Option<V>, E>;

/// The outcome of resuming a coroutine once.
pub enum Step<V, E> {
    /// Suspend until the promise settles; its outcome feeds the next resume.
    Await(Promise<V, E>),

    /// Give up the current step without waiting on anything; the task is
    /// immediately eligible to be chosen again.
    Yield,

    /// Finish with a value. `None` is the "finished without a value" case.
    Done(Option<V>),

    /// Finish with an error.
    Fail(E),
}

/// A resumable unit of work owned by exactly one task.
///
/// `resume` is only ever called by the pump, with at most one coroutine
/// mid-resume process-wide. Once a coroutine returns [`Step::Done`] or
/// [`Step::Fail`] it is never resumed again.
pub trait Coroutine<V, E> {
    /// Advance to the next suspension point or to completion.
    fn resume(&mut self, input: Resume<V, E>) -> Step<V, E>;
}

/// Adapter turning a closure into a [`Coroutine`].
///
/// The closure holds whatever state the computation needs between resumes,
/// standing in for languages' native generator objects.
pub struct StepFn<F>(F);

impl<V, E, F> Coroutine<V, E> for StepFn<F>
where
    F: FnMut(Resume<V, E>) -> Step<V, E>,
{
    fn resume(&mut self, input: Resume<V, E>) -> Step<V, E> {
        (self.0)(input)
    }
}

/// Build a coroutine from a stepwise closure.
pub fn step_fn<V, E, F>(f: F) -> StepFn<F>
where
    F: FnMut(Resume<V, E>) -> Step<V, E>,
{
    StepFn(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_fn_holds_state_between_resumes() {
        let mut step = 0;
        let mut co = step_fn(move |input: Resume<i32, String>| {
            step += 1;
            match step {
                1 => {
                    assert_eq!(input, Ok(None));
                    Step::Yield
                }
                _ => Step::Done(Some(step)),
            }
        });

        assert!(matches!(co.resume(Ok(None)), Step::Yield));
        assert!(matches!(co.resume(Ok(None)), Step::Done(Some(2))));
    }

    #[test]
    fn test_step_fn_receives_rejection() {
        let mut co = step_fn(|input: Resume<i32, String>| match input {
            Ok(v) => Step::Done(v),
            Err(e) => Step::Fail(e),
        });

        match co.resume(Err("nope".to_string())) {
            Step::Fail(e) => assert_eq!(e, "nope"),
            _ => panic!("expected Fail"),
        }
    }
}
