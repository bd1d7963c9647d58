use futures::future::{CatchUnwind, FutureExt};
use pin_project::pin_project;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::outcome::Outcome;

// The uniform child wrapper every combinator is built on. It isolates the
// child's panic, remembers whether the child was ever polled, and replaces
// the finished future with its outcome in place (the future is dropped at
// that point, like `MaybeDone`).
#[pin_project]
pub(crate) struct Adapter<F: Future> {
    #[pin]
    inner: Inner<F>,
    started: bool,
}

#[pin_project(project = InnerProj)]
enum Inner<F: Future> {
    Running(#[pin] CatchUnwind<AssertUnwindSafe<F>>),
    Settled(Option<Outcome<F::Output>>),
}

impl<F: Future> Adapter<F> {
    pub(crate) fn new(future: F) -> Self {
        Adapter {
            inner: Inner::Running(AssertUnwindSafe(future).catch_unwind()),
            started: false,
        }
    }

    /// Whether the child has been polled at least once.
    pub(crate) fn started(&self) -> bool {
        self.started
    }

    // Idempotent once the child has settled.
    pub(crate) fn poll_settle(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut this = self.project();
        *this.started = true;
        let outcome = match this.inner.as_mut().project() {
            InnerProj::Running(future) => match future.poll(cx) {
                Poll::Ready(result) => Outcome::from_caught(result),
                Poll::Pending => return Poll::Pending,
            },
            InnerProj::Settled(_) => return Poll::Ready(()),
        };
        this.inner.set(Inner::Settled(Some(outcome)));
        Poll::Ready(())
    }

    pub(crate) fn has_failed(&self) -> bool {
        matches!(&self.inner, Inner::Settled(Some(Outcome::Failure(_))))
    }

    pub(crate) fn outcome_ref(&self) -> Option<&Outcome<F::Output>> {
        match &self.inner {
            Inner::Settled(slot) => slot.as_ref(),
            Inner::Running(_) => None,
        }
    }

    pub(crate) fn take_outcome(self: Pin<&mut Self>) -> Outcome<F::Output> {
        match self.project().inner.project() {
            InnerProj::Settled(slot) => slot.take().expect("result already taken"),
            InnerProj::Running(_) => panic!("child has not settled"),
        }
    }

    pub(crate) fn take_value(self: Pin<&mut Self>) -> F::Output {
        self.take_outcome().value()
    }
}

// Pinned-slice access for the range combinators, in the manner of
// `futures::future::join_all`.
pub(crate) fn iter_pin_mut<T>(slice: Pin<&mut [T]>) -> impl Iterator<Item = Pin<&mut T>> {
    // Safety: no element is ever moved out of the pinned slice.
    unsafe { slice.get_unchecked_mut() }
        .iter_mut()
        .map(|item| unsafe { Pin::new_unchecked(item) })
}

pub(crate) fn get_pin_mut<T>(slice: Pin<&mut [T]>, index: usize) -> Pin<&mut T> {
    // Safety: same as `iter_pin_mut`; the element stays pinned in place.
    unsafe { Pin::new_unchecked(&mut slice.get_unchecked_mut()[index]) }
}
