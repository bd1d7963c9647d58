//! Fail-fast aggregation over fallible children.
//!
//! The `try_all` family is the [`all`](crate::all()) family for children
//! whose output is `Result<V, E>`. A child counts as failed both when it
//! panics and when it completes on the `Err` arm; either kind stops later
//! siblings from starting. Once every started child has settled, the first
//! recorded failure decides the outcome: a panic is re-raised verbatim, an
//! `Err` arm is returned as the combinator's own `Err`.

use pin_project::pin_project;

use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::adapter::{get_pin_mut, iter_pin_mut, Adapter};
use crate::cancel::Cancel;
use crate::outcome::Outcome;

fn drive<V, E, F>(
    mut child: Pin<&mut Adapter<F>>,
    cx: &mut Context<'_>,
    index: usize,
    failed: &mut Option<usize>,
    token: Option<&dyn Cancel>,
    pending: &mut bool,
) where
    F: Future<Output = Result<V, E>>,
{
    if !child.started() && failed.is_some() {
        return;
    }
    match child.as_mut().poll_settle(cx) {
        Poll::Ready(()) => {
            let success = matches!(child.outcome_ref(), Some(Outcome::Value(Ok(_))));
            if !success && failed.is_none() {
                *failed = Some(index);
                if let Some(token) = token {
                    token.request();
                }
            }
        }
        Poll::Pending => *pending = true,
    }
}

fn take_ok<V, E, F>(child: Pin<&mut Adapter<F>>) -> V
where
    F: Future<Output = Result<V, E>>,
{
    match child.take_outcome() {
        Outcome::Value(Ok(value)) => value,
        _ => unreachable!("child settled successfully"),
    }
}

macro_rules! generate_try_all {
    ($(
        $(#[$doc:meta])*
        ($TryAll:ident, $try_all:ident, <$($F:ident => $f:ident => $V:ident @ $index:tt),+>),
    )*) => ($(
        #[doc = concat!("Future for the [`", stringify!($try_all), "`](", stringify!($try_all), "()) function.")]
        #[pin_project]
        #[must_use = "futures do nothing unless polled"]
        pub struct $TryAll<'c, $($F: Future),+> {
            $(#[pin] $f: Adapter<$F>,)+
            failed: Option<usize>,
            token: Option<&'c dyn Cancel>,
        }

        impl<'c, $($F: Future),+> $TryAll<'c, $($F),+> {
            /// Requests cancellation on `token` the moment the first child
            /// fails, whether by panicking or by completing on the `Err` arm.
            pub fn cancel_on_failure(mut self, token: &'c dyn Cancel) -> Self {
                self.token = Some(token);
                self
            }
        }

        impl<'c, $($V,)+ E, $($F: Future<Output = Result<$V, E>>),+> Future
            for $TryAll<'c, $($F),+>
        {
            type Output = Result<($($V,)+), E>;

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
                            return match this.$f.as_mut().take_outcome() {
                                Outcome::Failure(payload) => panic::resume_unwind(payload),
                                Outcome::Value(Err(error)) => Poll::Ready(Err(error)),
                                Outcome::Value(Ok(_)) => unreachable!("error expected"),
                            };
                        }
                    )+
                    unreachable!("failed child out of range");
                }
                Poll::Ready(Ok(($(take_ok(this.$f.as_mut()),)+)))
            }
        }

        $(#[$doc])*
        pub fn $try_all<'c, $($V,)+ E, $($F: Future<Output = Result<$V, E>>),+>(
            $($f: $F),+
        ) -> $TryAll<'c, $($F),+> {
            $TryAll {
                $($f: Adapter::new($f),)+
                failed: None,
                token: None,
            }
        }
    )*)
}

generate_try_all! {
    /// Waits for two fallible children, returning both `Ok` values, the
    /// first recorded `Err`, or re-raising the first recorded panic.
    (TryAll2, try_all, <FutA => a => AV @ 0, FutB => b => BV @ 1>),

    /// Same as [`try_all`](try_all()), but for three children.
    (TryAll3, try_all3, <FutA => a => AV @ 0, FutB => b => BV @ 1, FutC => c => CV @ 2>),

    /// Same as [`try_all`](try_all()), but for four children.
    (TryAll4, try_all4, <FutA => a => AV @ 0, FutB => b => BV @ 1, FutC => c => CV @ 2, FutD => d => DV @ 3>),

    /// Same as [`try_all`](try_all()), but for five children.
    (TryAll5, try_all5, <FutA => a => AV @ 0, FutB => b => BV @ 1, FutC => c => CV @ 2, FutD => d => DV @ 3, FutE => e => EV @ 4>),
}

/// Future for the [`try_all_range`](try_all_range()) function.
#[must_use = "futures do nothing unless polled"]
pub struct TryAllRange<'c, F: Future> {
    children: Pin<Box<[Adapter<F>]>>,
    failed: Option<usize>,
    token: Option<&'c dyn Cancel>,
}

impl<'c, F: Future> TryAllRange<'c, F> {
    /// Requests cancellation on `token` the moment the first child fails.
    pub fn cancel_on_failure(mut self, token: &'c dyn Cancel) -> Self {
        self.token = Some(token);
        self
    }
}

impl<'c, V, E, F: Future<Output = Result<V, E>>> Future for TryAllRange<'c, F> {
    type Output = Result<Vec<V>, E>;

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
            return match get_pin_mut(this.children.as_mut(), failed).take_outcome() {
                Outcome::Failure(payload) => panic::resume_unwind(payload),
                Outcome::Value(Err(error)) => Poll::Ready(Err(error)),
                Outcome::Value(Ok(_)) => unreachable!("error expected"),
            };
        }
        let values = iter_pin_mut(this.children.as_mut()).map(take_ok).collect();
        Poll::Ready(Ok(values))
    }
}

/// Waits for every fallible child in the range, short-circuiting the start
/// of later children on the first failure. An empty range resolves to
/// `Ok(vec![])`.
pub fn try_all_range<'c, I, V, E>(awaitables: I) -> TryAllRange<'c, I::Item>
where
    I: IntoIterator,
    I::Item: Future<Output = Result<V, E>>,
{
    let children: Box<[_]> = awaitables.into_iter().map(Adapter::new).collect();
    TryAllRange {
        children: children.into(),
        failed: None,
        token: None,
    }
}
