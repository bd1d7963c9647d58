//! Fail-fast aggregation: wait for every child, stop starting new ones the
//! moment one fails.
//!
//! Children are started (first polled) in argument order. A child that fails
//! before a later sibling has started prevents that sibling from ever
//! running; children that did start are always driven to completion before
//! the combinator resolves, so no started work is dropped mid-flight. The
//! first recorded failure is re-raised verbatim once everything has settled.

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
    failed: &mut Option<usize>,
    token: Option<&dyn Cancel>,
    pending: &mut bool,
) where
    F: Future,
{
    if !child.started() && failed.is_some() {
        // a sibling already failed; this child is never started
        return;
    }
    match child.as_mut().poll_settle(cx) {
        Poll::Ready(()) => {
            if child.has_failed() && failed.is_none() {
                *failed = Some(index);
                if let Some(token) = token {
                    token.request();
                }
            }
        }
        Poll::Pending => *pending = true,
    }
}

macro_rules! generate_all {
    ($(
        $(#[$doc:meta])*
        ($All:ident, $all:ident, <$($F:ident => $f:ident @ $index:tt),+>),
    )*) => ($(
        #[doc = concat!("Future for the [`", stringify!($all), "`](", stringify!($all), "()) function.")]
        #[pin_project]
        #[must_use = "futures do nothing unless polled"]
        pub struct $All<'c, $($F: Future),+> {
            $(#[pin] $f: Adapter<$F>,)+
            failed: Option<usize>,
            token: Option<&'c dyn Cancel>,
        }

        impl<'c, $($F: Future),+> $All<'c, $($F),+> {
            /// Requests cancellation on `token` the moment the first child
            /// fails. Long-running siblings that observe the token can then
            /// wind down instead of delaying the combinator.
            pub fn cancel_on_failure(mut self, token: &'c dyn Cancel) -> Self {
                self.token = Some(token);
                self
            }
        }

        impl<'c, $($F: Future),+> Future for $All<'c, $($F),+> {
            type Output = ($($F::Output,)+);

            fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
                let mut this = self.project();
                let mut pending = false;
                $(
                    drive(this.$f.as_mut(), cx, $index, this.failed, *this.token, &mut pending);
                )+
                if pending {
                    return Poll::Pending;
                }
                if let Some(failed) = *this.failed {
                    $(
                        if failed == $index {
                            match this.$f.as_mut().take_outcome() {
                                Outcome::Failure(payload) => panic::resume_unwind(payload),
                                Outcome::Value(_) => unreachable!("failure expected"),
                            }
                        }
                    )+
                    unreachable!("failed child out of range");
                }
                Poll::Ready(($(this.$f.as_mut().take_value(),)+))
            }
        }

        $(#[$doc])*
        pub fn $all<'c, $($F: Future),+>($($f: $F),+) -> $All<'c, $($F),+> {
            $All {
                $($f: Adapter::new($f),)+
                failed: None,
                token: None,
            }
        }
    )*)
}

generate_all! {
    /// Waits for two children, returning both values, or re-raises the
    /// first recorded failure once every started child has settled.
    (All2, all, <A => a @ 0, B => b @ 1>),

    /// Same as [`all`](all()), but for three children.
    (All3, all3, <A => a @ 0, B => b @ 1, C => c @ 2>),

    /// Same as [`all`](all()), but for four children.
    (All4, all4, <A => a @ 0, B => b @ 1, C => c @ 2, D => d @ 3>),

    /// Same as [`all`](all()), but for five children.
    (All5, all5, <A => a @ 0, B => b @ 1, C => c @ 2, D => d @ 3, E => e @ 4>),
}

/// Future for the [`all_range`](all_range()) function.
#[must_use = "futures do nothing unless polled"]
pub struct AllRange<'c, F: Future> {
    children: Pin<Box<[Adapter<F>]>>,
    failed: Option<usize>,
    token: Option<&'c dyn Cancel>,
}

impl<'c, F: Future> AllRange<'c, F> {
    /// Requests cancellation on `token` the moment the first child fails.
    pub fn cancel_on_failure(mut self, token: &'c dyn Cancel) -> Self {
        self.token = Some(token);
        self
    }
}

impl<'c, F: Future> Future for AllRange<'c, F> {
    type Output = Vec<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut pending = false;
        for (index, child) in iter_pin_mut(this.children.as_mut()).enumerate() {
            drive(child, cx, index, &mut this.failed, this.token, &mut pending);
        }
        if pending {
            return Poll::Pending;
        }
        if let Some(failed) = this.failed {
            match get_pin_mut(this.children.as_mut(), failed).take_outcome() {
                Outcome::Failure(payload) => panic::resume_unwind(payload),
                Outcome::Value(_) => unreachable!("failure expected"),
            }
        }
        let values = iter_pin_mut(this.children.as_mut())
            .map(|child| child.take_value())
            .collect();
        Poll::Ready(values)
    }
}

/// Waits for every child in the range, preserving input order in the
/// returned values. An empty range resolves immediately to an empty `Vec`.
pub fn all_range<'c, I>(awaitables: I) -> AllRange<'c, I::Item>
where
    I: IntoIterator,
    I::Item: Future,
{
    let children: Box<[_]> = awaitables.into_iter().map(Adapter::new).collect();
    AllRange {
        children: children.into(),
        failed: None,
        token: None,
    }
}
