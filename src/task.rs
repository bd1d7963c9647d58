use futures::future::{CatchUnwind, FutureExt};
use pin_project::pin_project;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::outcome::Outcome;

/// A lazy, move-only, single-consumer handle over a computation.
///
/// Construction does no work; the computation begins when the task is first
/// polled and a never-polled task is dropped without running at all. A panic
/// inside the body surfaces at the `await` that consumes the task, not
/// before.
///
/// `Task` erases the concrete future type, which is what lets heterogeneous
/// computations travel through homogeneous collections (the `*_range`
/// combinators) and through a [`Nursery`](crate::Nursery).
#[must_use = "futures do nothing unless polled"]
pub struct Task<T> {
    future: Pin<Box<dyn Future<Output = T> + Send + 'static>>,
}

impl<T> Task<T> {
    /// Wraps a future into a task.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Task {
            future: Box::pin(future),
        }
    }

    /// Converts the task into a future that resolves to its [`Outcome`]
    /// instead of propagating a panic.
    pub fn settle(self) -> Settle<T> {
        Settle {
            inner: AssertUnwindSafe(self).catch_unwind(),
        }
    }
}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        self.future.as_mut().poll(cx)
    }
}

/// Future for the [`settle`](Task::settle) method.
#[pin_project]
#[must_use = "futures do nothing unless polled"]
pub struct Settle<T> {
    #[pin]
    inner: CatchUnwind<AssertUnwindSafe<Task<T>>>,
}

impl<T> Future for Settle<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        self.project()
            .inner
            .poll(cx)
            .map(Outcome::from_caught)
    }
}
