// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`AsyncResult`], a handle to one in-flight asynchronous computation.

use std::{
    fmt::Debug,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
    time::{Duration, Instant},
};

use futures::future::abortable;
use parking_lot::{Condvar, Mutex};

use crate::{Error, Result, Spawner};

/// The terminal state of an [`AsyncResult`].
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// The computation produced a value.
    Completed(T),
    /// The computation failed.
    Failed(Error),
    /// The computation was cancelled before it produced a value.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Returns `true` for [`Outcome::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Returns `true` for [`Outcome::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns `true` for [`Outcome::Cancelled`].
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the value of a completed computation.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed(_) | Self::Cancelled => None,
        }
    }

    /// Converts into a `Result`, mapping cancellation to [`Error::cancelled`].
    ///
    /// # Errors
    ///
    /// Returns the failure, or a cancellation error.
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Failed(error) => Err(error),
            Self::Cancelled => Err(Error::cancelled()),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(error) => Self::Failed(error),
        }
    }
}

type Observer<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;
type CancelHook = Box<dyn FnOnce() + Send>;

struct Listeners<T> {
    observers: Vec<Observer<T>>,
    cancel_hooks: Vec<CancelHook>,
    wakers: Vec<Waker>,
}

impl<T> Listeners<T> {
    fn new() -> Self {
        Self {
            observers: Vec::new(),
            cancel_hooks: Vec::new(),
            wakers: Vec::new(),
        }
    }
}

enum State<T> {
    Pending(Listeners<T>),
    Finished(Arc<Outcome<T>>),
}

struct Shared<T> {
    state: Mutex<State<T>>,
    finished: Condvar,
}

impl<T> Shared<T> {
    fn pending() -> Self {
        Self {
            state: Mutex::new(State::Pending(Listeners::new())),
            finished: Condvar::new(),
        }
    }

    fn finished(outcome: Outcome<T>) -> Self {
        Self {
            state: Mutex::new(State::Finished(Arc::new(outcome))),
            finished: Condvar::new(),
        }
    }

    /// Moves to the terminal state. Returns `false` if another outcome got there first.
    fn settle(&self, outcome: Outcome<T>) -> bool {
        let outcome = Arc::new(outcome);

        let listeners = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Finished(Arc::clone(&outcome))) {
                State::Pending(listeners) => listeners,
                finished @ State::Finished(_) => {
                    *state = finished;
                    return false;
                }
            }
        };

        let Listeners {
            observers,
            cancel_hooks,
            wakers,
        } = listeners;

        // Waiters are released when the guard drops, even if a listener panics.
        let _release = Release { shared: self, wakers };

        // Listeners run outside the lock so they are free to call back into this result.
        // Observers run before waiters are released, so a joined result has fired its callbacks.
        if outcome.is_cancelled() {
            cancel_hooks.into_iter().for_each(|hook| hook());
        }
        for observer in observers {
            observer(&outcome);
        }
        true
    }

    fn outcome(&self) -> Option<Arc<Outcome<T>>> {
        match &*self.state.lock() {
            State::Pending(_) => None,
            State::Finished(outcome) => Some(Arc::clone(outcome)),
        }
    }

    fn observe(&self, observer: Observer<T>) {
        let outcome = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(listeners) => {
                    listeners.observers.push(observer);
                    return;
                }
                State::Finished(outcome) => Arc::clone(outcome),
            }
        };
        observer(&outcome);
    }

    fn on_cancel(&self, hook: CancelHook) {
        let cancelled = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(listeners) => {
                    listeners.cancel_hooks.push(hook);
                    return;
                }
                State::Finished(outcome) => outcome.is_cancelled(),
            }
        };
        if cancelled {
            hook();
        }
    }

    fn wait(&self) -> Arc<Outcome<T>> {
        let mut state = self.state.lock();
        loop {
            if let State::Finished(outcome) = &*state {
                return Arc::clone(outcome);
            }
            self.finished.wait(&mut state);
        }
    }

    fn wait_for(&self, timeout: Duration) -> Option<Arc<Outcome<T>>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait());
        };

        let mut state = self.state.lock();
        loop {
            if let State::Finished(outcome) = &*state {
                return Some(Arc::clone(outcome));
            }
            if self.finished.wait_until(&mut state, deadline).timed_out() {
                return match &*state {
                    State::Pending(_) => None,
                    State::Finished(outcome) => Some(Arc::clone(outcome)),
                };
            }
        }
    }

    fn poll_outcome(&self, cx: &Context<'_>) -> Poll<Arc<Outcome<T>>> {
        let mut state = self.state.lock();
        match &mut *state {
            State::Finished(outcome) => Poll::Ready(Arc::clone(outcome)),
            State::Pending(listeners) => {
                if !listeners.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                    listeners.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

/// Wakes blocked and polling waiters of a settled result on drop.
struct Release<'a, T> {
    shared: &'a Shared<T>,
    wakers: Vec<Waker>,
}

impl<T> Drop for Release<'_, T> {
    fn drop(&mut self) {
        self.shared.finished.notify_all();
        self.wakers.drain(..).for_each(Waker::wake);
    }
}

/// A handle to a single asynchronous computation.
///
/// An `AsyncResult` starts pending and moves exactly once to a terminal [`Outcome`]: completed,
/// failed or cancelled. Later transitions are ignored, so a computation that finishes after
/// its result was cancelled is silently discarded.
///
/// Handles are cheap to clone; every clone observes the same computation. The result can be
/// consumed in several ways:
///
/// - `.await` it (the output is a [`Result`], cancellation maps to [`Error::cancelled`]),
/// - block on it with [`join`](Self::join) or [`join_timeout`](Self::join_timeout),
/// - register observers with [`on_success`](Self::on_success) or [`on_complete`](Self::on_complete).
///
/// # Examples
///
/// ```
/// use stratum_tier::{AsyncResult, Spawner};
///
/// # #[tokio::main]
/// # async fn main() {
/// let spawner = Spawner::new_tokio();
/// let result = AsyncResult::spawn(&spawner, async { Ok(21 * 2) });
///
/// result.on_success(|value| assert_eq!(*value, 42));
/// assert_eq!(result.await.unwrap(), 42);
/// # }
/// ```
pub struct AsyncResult<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + Sync + 'static> AsyncResult<T> {
    /// Runs `work` on `spawner` and returns a handle to its result.
    ///
    /// Cancelling the handle asks the work to stop: the future is dropped the next time it is
    /// polled. Work that is busy inside a poll keeps running until it yields or finishes, and its
    /// outcome is then discarded.
    pub fn spawn<F>(spawner: &Spawner, work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (completer, result) = Self::pending();
        let (work, abort) = abortable(work);
        completer.on_cancel(move || abort.abort());

        spawner.spawn(async move {
            if let Ok(outcome) = work.await {
                completer.settle(outcome.into());
            }
        });

        result
    }
}

impl<T> AsyncResult<T> {
    /// Creates a pending result and the [`Completer`] that settles it.
    ///
    /// Use this to bridge callback-based producers into the `AsyncResult` model.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum_tier::AsyncResult;
    ///
    /// let (completer, result) = AsyncResult::pending();
    /// std::thread::spawn(move || completer.complete("value"));
    /// assert_eq!(result.join().unwrap(), "value");
    /// ```
    #[must_use]
    pub fn pending() -> (Completer<T>, Self) {
        let shared = Arc::new(Shared::pending());
        (
            Completer {
                shared: Arc::clone(&shared),
            },
            Self { shared },
        )
    }

    /// Creates an already completed result.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self::settled(Outcome::Completed(value))
    }

    /// Creates an already failed result.
    #[must_use]
    pub fn failed(error: Error) -> Self {
        Self::settled(Outcome::Failed(error))
    }

    /// Creates a result that is already in the given terminal state.
    #[must_use]
    pub fn settled(outcome: Outcome<T>) -> Self {
        Self {
            shared: Arc::new(Shared::finished(outcome)),
        }
    }

    /// Cancels the computation.
    ///
    /// A pending result becomes cancelled immediately and every waiter is released. The request
    /// is forwarded to the producer, which may or may not act on it. Returns `false` if the
    /// result had already reached a terminal state.
    pub fn cancel(&self) -> bool {
        self.shared.settle(Outcome::Cancelled)
    }

    /// Returns `true` once the result reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.shared.outcome().is_some()
    }

    /// Returns `true` if the result was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.outcome().is_some_and(|outcome| outcome.is_cancelled())
    }

    /// Registers an observer of the terminal state.
    ///
    /// The observer runs exactly once: on the thread that settles the result, or right away if the
    /// result is already terminal.
    pub fn on_complete<F>(&self, observer: F)
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        self.shared.observe(Box::new(observer));
    }

    /// Registers a callback for the computed value.
    ///
    /// The callback runs at most once, and only if the computation completes. It never runs for
    /// failed or cancelled computations. Registering after completion runs it immediately.
    pub fn on_success<F>(&self, callback: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.on_complete(move |outcome| {
            if let Outcome::Completed(value) = outcome {
                callback(value);
            }
        });
    }
}

impl<T: Clone> AsyncResult<T> {
    /// Returns the terminal state, or `None` while pending.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.shared.outcome().map(|outcome| (*outcome).clone())
    }

    /// Blocks the current thread until the result is terminal.
    ///
    /// Do not call this from inside an async task; `.await` the result instead.
    ///
    /// # Errors
    ///
    /// Returns the failure of the computation, or a cancellation error.
    pub fn join(&self) -> Result<T> {
        (*self.shared.wait()).clone().into_result()
    }

    /// Blocks the current thread until the result is terminal or `timeout` elapses.
    ///
    /// Returns `None` on timeout. Timing out does not cancel the computation.
    pub fn join_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        self.shared.wait_for(timeout).map(|outcome| (*outcome).clone().into_result())
    }
}

impl<T> Clone for AsyncResult<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.shared.outcome().as_deref() {
            None => "pending",
            Some(Outcome::Completed(_)) => "completed",
            Some(Outcome::Failed(_)) => "failed",
            Some(Outcome::Cancelled) => "cancelled",
        };
        f.debug_struct("AsyncResult").field("state", &state).finish()
    }
}

impl<T: Clone> Future for AsyncResult<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.shared.poll_outcome(cx).map(|outcome| (*outcome).clone().into_result())
    }
}

/// The producing side of an [`AsyncResult`].
///
/// Settling is first-wins: once the result is terminal (including by cancellation), further
/// attempts return `false` and are discarded. Dropping a completer without settling fails the
/// result, so waiters are never left hanging.
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completer<T> {
    /// Completes the result with `value`.
    pub fn complete(self, value: T) -> bool {
        self.settle(Outcome::Completed(value))
    }

    /// Fails the result with `error`.
    pub fn fail(self, error: Error) -> bool {
        self.settle(Outcome::Failed(error))
    }

    /// Moves the result to `outcome`.
    pub fn settle(self, outcome: Outcome<T>) -> bool {
        self.shared.settle(outcome)
    }

    /// Returns `true` if the consumer cancelled the result.
    ///
    /// Long-running producers check this at convenient points to stop early.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.outcome().is_some_and(|outcome| outcome.is_cancelled())
    }

    /// Registers a hook that runs when the result is cancelled.
    ///
    /// Runs immediately if the result is already cancelled; never runs if the result reaches any
    /// other terminal state.
    pub fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.on_cancel(Box::new(hook));
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.shared.outcome().is_none() {
            self.shared
                .settle(Outcome::Failed(Error::caused_by("computation was abandoned before producing a result")));
        }
    }
}

impl<T> Debug for Completer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completer").finish_non_exhaustive()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    static_assertions::assert_impl_all!(AsyncResult<String>: Send, Sync, Clone, Unpin);
    static_assertions::assert_impl_all!(Completer<String>: Send, Sync);

    #[test]
    fn ready_is_terminal() {
        let result = AsyncResult::ready(5);

        assert!(result.is_finished());
        assert!(!result.is_cancelled());
        assert!(!result.cancel());
        assert_eq!(result.join().unwrap(), 5);
    }

    #[test]
    fn failed_is_terminal() {
        let result = AsyncResult::<i32>::failed(Error::caused_by("boom"));

        assert!(result.outcome().unwrap().is_failed());
        assert_eq!(result.join().unwrap_err().to_string(), "boom");
    }

    #[test]
    fn first_settle_wins() {
        let (completer, result) = AsyncResult::pending();
        assert!(result.cancel());
        assert!(!completer.complete(1));

        assert!(result.is_cancelled());
        assert!(result.join().unwrap_err().is_cancelled());
    }

    #[test]
    fn join_blocks_until_completed() {
        let (completer, result) = AsyncResult::pending();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete("done");
        });

        assert_eq!(result.join().unwrap(), "done");
        producer.join().unwrap();
    }

    #[test]
    fn join_timeout_does_not_cancel() {
        let (completer, result) = AsyncResult::<i32>::pending();

        assert!(result.join_timeout(Duration::from_millis(10)).is_none());
        assert!(!result.is_finished());

        completer.complete(3);
        assert_eq!(result.join_timeout(Duration::from_millis(10)).unwrap().unwrap(), 3);
    }

    #[test]
    fn cancel_releases_blocked_waiter() {
        let (_completer, result) = AsyncResult::<i32>::pending();
        let waiter = {
            let result = result.clone();
            thread::spawn(move || result.join())
        };

        thread::sleep(Duration::from_millis(20));
        result.cancel();

        assert!(waiter.join().unwrap().unwrap_err().is_cancelled());
    }

    #[test]
    fn dropped_completer_fails_result() {
        let (completer, result) = AsyncResult::<i32>::pending();
        drop(completer);

        let error = result.join().unwrap_err();
        assert!(!error.is_cancelled());
        assert!(error.to_string().contains("abandoned"));
    }

    #[test]
    fn cancel_hooks_run_only_on_cancellation() {
        let calls = Arc::new(AtomicUsize::new(0));

        let (completer, result) = AsyncResult::<i32>::pending();
        let counter = Arc::clone(&calls);
        completer.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        completer.complete(1);
        assert!(!result.cancel());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let (completer, result) = AsyncResult::<i32>::pending();
        let counter = Arc::clone(&calls);
        completer.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        result.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Registered after the fact: runs right away.
        let counter = Arc::clone(&calls);
        completer.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(completer.is_cancelled());
    }

    #[test]
    fn on_success_skips_cancelled_results() {
        let calls = Arc::new(AtomicUsize::new(0));

        let (completer, result) = AsyncResult::<i32>::pending();
        let counter = Arc::clone(&calls);
        result.on_success(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(result.cancel());
        assert!(!completer.complete(1));

        // Registered after cancellation: never runs either.
        let counter = Arc::clone(&calls);
        result.on_success(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_observer_still_releases_waiters() {
        let (completer, result) = AsyncResult::pending();
        result.on_complete(|_| panic!("observer failure"));

        let waiter = {
            let result = result.clone();
            thread::spawn(move || result.join())
        };
        thread::sleep(Duration::from_millis(20));

        let settled = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| completer.complete(4)));
        assert!(settled.is_err());

        assert_eq!(waiter.join().unwrap().unwrap(), 4);
    }

    #[test]
    fn observers_may_reenter_the_result() {
        let (completer, result) = AsyncResult::pending();
        let inner = result.clone();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        result.on_complete(move |_| {
            *sink.lock() = Some(inner.join().unwrap());
        });

        completer.complete(9);
        assert_eq!(*seen.lock(), Some(9));
    }

    #[test]
    fn debug_reports_state() {
        let (completer, result) = AsyncResult::pending();
        assert!(format!("{result:?}").contains("pending"));
        completer.complete(());
        assert!(format!("{result:?}").contains("completed"));
        assert!(format!("{:?}", AsyncResult::<()>::settled(Outcome::Cancelled)).contains("cancelled"));
    }

    #[test]
    fn await_yields_value() {
        futures::executor::block_on(async {
            let (completer, result) = AsyncResult::pending();
            thread::spawn(move || completer.complete(11));
            assert_eq!(result.await.unwrap(), 11);
        });
    }

    #[test]
    fn outcome_into_result() {
        assert_eq!(Outcome::Completed(1).into_result().unwrap(), 1);
        assert!(Outcome::<i32>::Cancelled.into_result().unwrap_err().is_cancelled());
        assert_eq!(Outcome::<i32>::Failed(Error::caused_by("x")).value(), None);
        assert!(Outcome::from(Ok::<_, Error>(1)).is_completed());
    }
}
