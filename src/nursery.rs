//! Scoped supervision of dynamically spawned children.
//!
//! A [`nursery`](nursery()) runs a body future alongside any number of
//! fire-and-forget children started through its [`Nursery`] handle. The
//! future returned by `nursery` does not resolve until the body has
//! completed *and* every started child has completed; the body's locals
//! may be gone while children are still draining, which is why `start`
//! demands `'static` children.
//!
//! Children are independent: a child's panic is caught and discarded, never
//! propagated to the parent. A body that wants a child's result arranges
//! the hand-off itself, typically through a
//! [`SingleEvent`](crate::SingleEvent) shared behind an `Arc`.

use futures::future::{BoxFuture, FutureExt};
use futures::stream::FuturesUnordered;
use futures::task::AtomicWaker;
use futures::StreamExt;
use pin_project::{pin_project, pinned_drop};

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::adapter::Adapter;

type ChildFuture = BoxFuture<'static, ()>;

struct Shared {
    // children handed over by `start` but not yet adopted by the parent's poll
    injected: parking_lot::Mutex<Vec<ChildFuture>>,
    waker: AtomicWaker,
    closed: AtomicBool,
}

/// Handle for starting children inside a [`nursery`](nursery()).
///
/// Cloneable and sendable; a child can start siblings with a clone of the
/// handle. Starting a child after the nursery has completed drops the child
/// without running it.
#[derive(Clone)]
pub struct Nursery {
    shared: Arc<Shared>,
}

impl Nursery {
    /// Starts a fire-and-forget child.
    ///
    /// The child is taken by value and must be `'static`: it cannot borrow
    /// from the nursery body, whose locals are destroyed before the
    /// children finish draining. The child's output is discarded, and so is
    /// its panic, if any.
    pub fn start<F>(&self, child: F)
    where
        F: Future + Send + 'static,
    {
        if self.shared.closed.load(Ordering::Acquire) {
            tracing::debug!("nursery already completed; dropping the child");
            return;
        }
        let child = AssertUnwindSafe(child).catch_unwind().map(|result| {
            if result.is_err() {
                tracing::debug!("nursery child panicked; discarding the payload");
            }
        });
        self.shared.injected.lock().push(child.boxed());
        self.shared.waker.wake();
    }
}

/// Future for the [`nursery`](nursery()) function.
#[pin_project(PinnedDrop)]
#[must_use = "futures do nothing unless polled"]
pub struct NurseryFuture<Fut: Future> {
    #[pin]
    body: Adapter<Fut>,
    children: FuturesUnordered<ChildFuture>,
    shared: Arc<Shared>,
}

impl<Fut: Future> Future for NurseryFuture<Fut> {
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        this.shared.waker.register(cx.waker());
        loop {
            let adopted = std::mem::take(&mut *this.shared.injected.lock());
            for child in adopted {
                this.children.push(child);
            }

            // children first, so a freshly started child reaches its first
            // suspension before the body resumes
            loop {
                match this.children.poll_next_unpin(cx) {
                    Poll::Ready(Some(())) => continue,
                    Poll::Ready(None) | Poll::Pending => break,
                }
            }

            let body_done = this.body.as_mut().poll_settle(cx).is_ready();

            // the body or a finishing child may have started another child
            if !this.shared.injected.lock().is_empty() {
                continue;
            }

            if body_done && this.children.is_empty() {
                this.shared.closed.store(true, Ordering::Release);
                // the body's own panic resumes only now, children drained
                return Poll::Ready(this.body.as_mut().take_value());
            }
            return Poll::Pending;
        }
    }
}

#[pinned_drop]
impl<Fut: Future> PinnedDrop for NurseryFuture<Fut> {
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        this.shared.closed.store(true, Ordering::Release);
        this.shared.injected.lock().clear();
    }
}

/// Runs `body` with a [`Nursery`] handle, supervising every child it starts.
///
/// The returned future yields the body's own value (or resumes its panic),
/// and only after the last child has completed.
pub fn nursery<F, Fut>(body: F) -> NurseryFuture<Fut>
where
    F: FnOnce(Nursery) -> Fut,
    Fut: Future,
{
    let shared = Arc::new(Shared {
        injected: parking_lot::Mutex::new(Vec::new()),
        waker: AtomicWaker::new(),
        closed: AtomicBool::new(false),
    });
    let handle = Nursery {
        shared: Arc::clone(&shared),
    };
    NurseryFuture {
        body: Adapter::new(body(handle)),
        children: FuturesUnordered::new(),
        shared,
    }
}
