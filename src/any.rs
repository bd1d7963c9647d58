//! First-success selection: resolve to the first child that completes with
//! a value, along with its index.
//!
//! Children share one output type and are started (first polled) in
//! argument order. Once a success is recorded, later children that have not
//! started yet never run; children that did start are driven to completion
//! before the combinator resolves. A recorded success is preferred over any
//! failure, however the two interleave; only when every child fails is the
//! first recorded failure re-raised.

use pin_project::pin_project;

use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::adapter::{get_pin_mut, iter_pin_mut, Adapter};
use crate::cancel::Cancel;
use crate::outcome::Outcome;

fn drive<F>(
    mut child: Pin<&mut Adapter<F>>,
    cx: &mut Context<'_>,
    index: usize,
    completed: &mut Option<usize>,
    failed: &mut Option<usize>,
    token: Option<&dyn Cancel>,
    pending: &mut bool,
) where
    F: Future,
{
    if !child.started() && completed.is_some() {
        // a sibling already succeeded; this child is never started
        return;
    }
    match child.as_mut().poll_settle(cx) {
        Poll::Ready(()) => {
            if child.has_failed() {
                if failed.is_none() {
                    *failed = Some(index);
                }
            } else if completed.is_none() {
                *completed = Some(index);
                if let Some(token) = token {
                    token.request();
                }
            }
        }
        Poll::Pending => *pending = true,
    }
}

macro_rules! generate_any {
    ($(
        $(#[$doc:meta])*
        ($Any:ident, $any:ident, <$A:ident => $a:ident, $($B:ident => $b:ident @ $index:tt),+>),
    )*) => ($(
        #[doc = concat!("Future for the [`", stringify!($any), "`](", stringify!($any), "()) function.")]
        #[pin_project]
        #[must_use = "futures do nothing unless polled"]
        pub struct $Any<'c, $A: Future, $($B: Future<Output = $A::Output>),+> {
            #[pin] $a: Adapter<$A>,
            $(#[pin] $b: Adapter<$B>,)+
            completed: Option<usize>,
            failed: Option<usize>,
            token: Option<&'c dyn Cancel>,
        }

        impl<'c, $A: Future, $($B: Future<Output = $A::Output>),+> $Any<'c, $A, $($B),+> {
            /// Requests cancellation on `token` the moment the first child
            /// succeeds, so the remaining started children can wind down.
            pub fn cancel_on_success(mut self, token: &'c dyn Cancel) -> Self {
                self.token = Some(token);
                self
            }
        }

        impl<'c, $A: Future, $($B: Future<Output = $A::Output>),+> Future for $Any<'c, $A, $($B),+> {
            type Output = (usize, $A::Output);

            fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
                let mut this = self.project();
                let mut pending = false;
                drive(this.$a.as_mut(), cx, 0, this.completed, this.failed, *this.token, &mut pending);
                $(
                    drive(this.$b.as_mut(), cx, $index, this.completed, this.failed, *this.token, &mut pending);
                )+
                if pending {
                    return Poll::Pending;
                }
                if let Some(completed) = *this.completed {
                    if completed == 0 {
                        return Poll::Ready((0, this.$a.as_mut().take_value()));
                    }
                    $(
                        if completed == $index {
                            return Poll::Ready(($index, this.$b.as_mut().take_value()));
                        }
                    )+
                    unreachable!("completed child out of range");
                }
                // every child failed; re-raise the first recorded failure
                let failed = this.failed.expect("no child settled");
                if failed == 0 {
                    match this.$a.as_mut().take_outcome() {
                        Outcome::Failure(payload) => panic::resume_unwind(payload),
                        Outcome::Value(_) => unreachable!("failure expected"),
                    }
                }
                $(
                    if failed == $index {
                        match this.$b.as_mut().take_outcome() {
                            Outcome::Failure(payload) => panic::resume_unwind(payload),
                            Outcome::Value(_) => unreachable!("failure expected"),
                        }
                    }
                )+
                unreachable!("failed child out of range");
            }
        }

        $(#[$doc])*
        pub fn $any<'c, $A: Future, $($B: Future<Output = $A::Output>),+>(
            $a: $A,
            $($b: $B),+
        ) -> $Any<'c, $A, $($B),+> {
            $Any {
                $a: Adapter::new($a),
                $($b: Adapter::new($b),)+
                completed: None,
                failed: None,
                token: None,
            }
        }
    )*)
}

generate_any! {
    /// Resolves to `(index, value)` of the first of two children to
    /// succeed; if both fail, re-raises the first recorded failure.
    (Any2, any, <A => a, B => b @ 1>),

    /// Same as [`any`](any()), but for three children.
    (Any3, any3, <A => a, B => b @ 1, C => c @ 2>),

    /// Same as [`any`](any()), but for four children.
    (Any4, any4, <A => a, B => b @ 1, C => c @ 2, D => d @ 3>),

    /// Same as [`any`](any()), but for five children.
    (Any5, any5, <A => a, B => b @ 1, C => c @ 2, D => d @ 3, E => e @ 4>),
}

/// Future for the [`any_range`](any_range()) function.
#[must_use = "futures do nothing unless polled"]
pub struct AnyRange<'c, F: Future> {
    children: Pin<Box<[Adapter<F>]>>,
    completed: Option<usize>,
    failed: Option<usize>,
    token: Option<&'c dyn Cancel>,
}

impl<'c, F: Future> AnyRange<'c, F> {
    /// Requests cancellation on `token` the moment the first child succeeds.
    pub fn cancel_on_success(mut self, token: &'c dyn Cancel) -> Self {
        self.token = Some(token);
        self
    }
}

impl<'c, F: Future> std::fmt::Debug for AnyRange<'c, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyRange").finish_non_exhaustive()
    }
}

impl<'c, F: Future> Future for AnyRange<'c, F> {
    type Output = (usize, F::Output);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut pending = false;
        for (index, child) in iter_pin_mut(this.children.as_mut()).enumerate() {
            drive(
                child,
                cx,
                index,
                &mut this.completed,
                &mut this.failed,
                this.token,
                &mut pending,
            );
        }
        if pending {
            return Poll::Pending;
        }
        if let Some(completed) = this.completed {
            let value = get_pin_mut(this.children.as_mut(), completed).take_value();
            return Poll::Ready((completed, value));
        }
        let failed = this.failed.expect("no child settled");
        match get_pin_mut(this.children.as_mut(), failed).take_outcome() {
            Outcome::Failure(payload) => panic::resume_unwind(payload),
            Outcome::Value(_) => unreachable!("failure expected"),
        }
    }
}

/// Resolves to `(index, value)` of the first child in the range to succeed.
///
/// # Panics
///
/// Panics with `"no tasks"` if the range is empty.
pub fn any_range<'c, I>(awaitables: I) -> AnyRange<'c, I::Item>
where
    I: IntoIterator,
    I::Item: Future,
{
    let children: Box<[_]> = awaitables.into_iter().map(Adapter::new).collect();
    assert!(!children.is_empty(), "no tasks");
    AnyRange {
        children: children.into(),
        completed: None,
        failed: None,
        token: None,
    }
}
