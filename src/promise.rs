//! Single-settlement asynchronous value cell
//!
//! This is the suspension primitive coroutines yield when they need to wait:
//! a pending placeholder that is later resolved with a value or rejected with
//! an error, exactly once. Continuations attached before settlement fire when
//! it settles; continuations attached afterwards fire immediately.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type Callback<V, E> = Box<dyn FnOnce(Result<V, E>)>;

enum State<V, E> {
    Pending(Vec<Callback<V, E>>),
    Settled(Result<V, E>),
}

/// A shareable, single-settlement promise.
///
/// Cloning yields another handle to the same cell. Settling an already
/// settled promise is a no-op; the first outcome wins.
///
/// Continuations run on the settler's call stack. Task resumption never
/// happens there directly: the pump only ever re-admits a task to its
/// scheduler from a continuation, and the actual resume is deferred to the
/// runtime's tick queue.
pub struct Promise<V, E> {
    inner: Arc<Mutex<State<V, E>>>,
}

impl<V, E> Clone for Promise<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V, E> fmt::Debug for Promise<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.lock() {
            State::Pending(_) => "pending",
            State::Settled(Ok(_)) => "resolved",
            State::Settled(Err(_)) => "rejected",
        };
        write!(f, "Promise({state})")
    }
}

impl<V, E> Promise<V, E>
where
    V: Clone + 'static,
    E: Clone + 'static,
{
    /// Create a promise with no outcome yet.
    pub fn pending() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::Pending(Vec::new()))),
        }
    }

    /// Create a promise already resolved with `value`.
    pub fn resolved(value: V) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::Settled(Ok(value)))),
        }
    }

    /// Create a promise already rejected with `error`.
    pub fn rejected(error: E) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::Settled(Err(error)))),
        }
    }

    /// Resolve with `value`. No-op if already settled.
    pub fn resolve(&self, value: V) {
        self.settle(Ok(value));
    }

    /// Reject with `error`. No-op if already settled.
    pub fn reject(&self, error: E) {
        self.settle(Err(error));
    }

    fn settle(&self, outcome: Result<V, E>) {
        let callbacks = {
            let mut state = self.inner.lock();
            match &mut *state {
                State::Pending(callbacks) => {
                    let callbacks = std::mem::take(callbacks);
                    *state = State::Settled(outcome.clone());
                    callbacks
                }
                State::Settled(_) => return,
            }
        };
        // Run continuations outside the lock so they may touch this promise.
        for callback in callbacks {
            callback(outcome.clone());
        }
    }

    /// Attach a continuation receiving the outcome, delivered exactly once.
    pub fn subscribe<F>(&self, f: F)
    where
        F: FnOnce(Result<V, E>) + 'static,
    {
        let outcome = {
            let mut state = self.inner.lock();
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.push(Box::new(f));
                    return;
                }
                State::Settled(outcome) => outcome.clone(),
            }
        };
        f(outcome);
    }

    /// Whether the promise has been resolved or rejected.
    pub fn is_settled(&self) -> bool {
        matches!(&*self.inner.lock(), State::Settled(_))
    }

    /// The outcome, if settled.
    pub fn try_get(&self) -> Option<Result<V, E>> {
        match &*self.inner.lock() {
            State::Pending(_) => None,
            State::Settled(outcome) => Some(outcome.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_then_resolve() {
        let p: Promise<i32, String> = Promise::pending();
        assert!(!p.is_settled());
        assert!(p.try_get().is_none());

        p.resolve(7);
        assert!(p.is_settled());
        assert_eq!(p.try_get(), Some(Ok(7)));
    }

    #[test]
    fn test_first_settlement_wins() {
        let p: Promise<i32, String> = Promise::pending();
        p.resolve(1);
        p.resolve(2);
        p.reject("late".to_string());
        assert_eq!(p.try_get(), Some(Ok(1)));
    }

    #[test]
    fn test_subscribe_before_settle() {
        let p: Promise<i32, String> = Promise::pending();
        let seen = Arc::new(Mutex::new(None));

        let seen2 = seen.clone();
        p.subscribe(move |outcome| *seen2.lock() = Some(outcome));
        assert!(seen.lock().is_none());

        p.resolve(42);
        assert_eq!(*seen.lock(), Some(Ok(42)));
    }

    #[test]
    fn test_subscribe_after_settle_fires_immediately() {
        let p: Promise<i32, String> = Promise::rejected("boom".to_string());
        let seen = Arc::new(Mutex::new(None));

        let seen2 = seen.clone();
        p.subscribe(move |outcome| *seen2.lock() = Some(outcome));
        assert_eq!(*seen.lock(), Some(Err("boom".to_string())));
    }

    #[test]
    fn test_multiple_subscribers() {
        let p: Promise<i32, String> = Promise::pending();
        let count = Arc::new(Mutex::new(0));

        for _ in 0..3 {
            let count = count.clone();
            p.subscribe(move |outcome| {
                assert_eq!(outcome, Ok(5));
                *count.lock() += 1;
            });
        }

        p.resolve(5);
        assert_eq!(*count.lock(), 3);
    }

    #[test]
    fn test_clone_shares_cell() {
        let p: Promise<i32, String> = Promise::pending();
        let q = p.clone();

        q.resolve(9);
        assert_eq!(p.try_get(), Some(Ok(9)));
    }
}
