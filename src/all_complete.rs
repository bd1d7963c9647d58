//! Settle-everything aggregation: wait for every child and report each
//! child's fate separately.
//!
//! Unlike [`all`](crate::all()), nothing short-circuits: every child is
//! started, every child is driven to completion, and each slot of the
//! result carries that child's [`Outcome`]: a value or its captured
//! panic. The combinator itself never panics.

use pin_project::pin_project;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::adapter::{iter_pin_mut, Adapter};
use crate::outcome::Outcome;

fn drive<F: Future>(child: Pin<&mut Adapter<F>>, cx: &mut Context<'_>, pending: &mut bool) {
    if child.poll_settle(cx).is_pending() {
        *pending = true;
    }
}

macro_rules! generate_all_complete {
    ($(
        $(#[$doc:meta])*
        ($AllComplete:ident, $all_complete:ident, <$($F:ident => $f:ident),+>),
    )*) => ($(
        #[doc = concat!("Future for the [`", stringify!($all_complete), "`](", stringify!($all_complete), "()) function.")]
        #[pin_project]
        #[must_use = "futures do nothing unless polled"]
        pub struct $AllComplete<$($F: Future),+> {
            $(#[pin] $f: Adapter<$F>,)+
        }

        impl<$($F: Future),+> Future for $AllComplete<$($F),+> {
            type Output = ($(Outcome<$F::Output>,)+);

            fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
                let mut this = self.project();
                let mut pending = false;
                $(
                    drive(this.$f.as_mut(), cx, &mut pending);
                )+
                if pending {
                    return Poll::Pending;
                }
                Poll::Ready(($(this.$f.as_mut().take_outcome(),)+))
            }
        }

        $(#[$doc])*
        pub fn $all_complete<$($F: Future),+>($($f: $F),+) -> $AllComplete<$($F),+> {
            $AllComplete {
                $($f: Adapter::new($f),)+
            }
        }
    )*)
}

generate_all_complete! {
    /// Waits for both children unconditionally, returning each child's
    /// [`Outcome`] without deciding between value and failure.
    (AllComplete2, all_complete, <A => a, B => b>),

    /// Same as [`all_complete`](all_complete()), but for three children.
    (AllComplete3, all_complete3, <A => a, B => b, C => c>),

    /// Same as [`all_complete`](all_complete()), but for four children.
    (AllComplete4, all_complete4, <A => a, B => b, C => c, D => d>),

    /// Same as [`all_complete`](all_complete()), but for five children.
    (AllComplete5, all_complete5, <A => a, B => b, C => c, D => d, E => e>),
}

/// Future for the [`all_complete_range`](all_complete_range()) function.
#[must_use = "futures do nothing unless polled"]
pub struct AllCompleteRange<F: Future> {
    children: Pin<Box<[Adapter<F>]>>,
}

impl<F: Future> Future for AllCompleteRange<F> {
    type Output = Vec<Outcome<F::Output>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut pending = false;
        for child in iter_pin_mut(this.children.as_mut()) {
            drive(child, cx, &mut pending);
        }
        if pending {
            return Poll::Pending;
        }
        let outcomes = iter_pin_mut(this.children.as_mut())
            .map(|child| child.take_outcome())
            .collect();
        Poll::Ready(outcomes)
    }
}

/// Waits for every child in the range, returning the outcomes in input
/// order. An empty range resolves immediately to an empty `Vec`.
pub fn all_complete_range<I>(awaitables: I) -> AllCompleteRange<I::Item>
where
    I: IntoIterator,
    I::Item: Future,
{
    let children: Box<[_]> = awaitables.into_iter().map(Adapter::new).collect();
    AllCompleteRange {
        children: children.into(),
    }
}
