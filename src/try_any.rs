//! First-success selection over fallible children.
//!
//! The `try_any` family is the [`any`](crate::any()) family for children
//! whose output is `Result<V, E>`. Success means completing on the `Ok`
//! arm; a child counts as failed both when it panics and when it completes
//! on the `Err` arm. If any child succeeds its `(index, Ok(value))` is
//! returned, whichever failures happened around it. With no success, the
//! first recorded failure decides: a panic is re-raised verbatim, an `Err`
//! arm is returned as `(index, Err(error))`, the fastest error.

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
    completed: &mut Option<usize>,
    failed: &mut Option<usize>,
    token: Option<&dyn Cancel>,
    pending: &mut bool,
) where
    F: Future<Output = Result<V, E>>,
{
    if !child.started() && completed.is_some() {
        return;
    }
    match child.as_mut().poll_settle(cx) {
        Poll::Ready(()) => {
            let success = matches!(child.outcome_ref(), Some(Outcome::Value(Ok(_))));
            if success {
                if completed.is_none() {
                    *completed = Some(index);
                    if let Some(token) = token {
                        token.request();
                    }
                }
            } else if failed.is_none() {
                *failed = Some(index);
            }
        }
        Poll::Pending => *pending = true,
    }
}

fn resolve<V, E, F>(child: Pin<&mut Adapter<F>>, index: usize) -> Poll<(usize, Result<V, E>)>
where
    F: Future<Output = Result<V, E>>,
{
    match child.take_outcome() {
        Outcome::Failure(payload) => panic::resume_unwind(payload),
        Outcome::Value(result) => Poll::Ready((index, result)),
    }
}

macro_rules! generate_try_any {
    ($(
        $(#[$doc:meta])*
        ($TryAny:ident, $try_any:ident, <$($F:ident => $f:ident @ $index:tt),+>),
    )*) => ($(
        #[doc = concat!("Future for the [`", stringify!($try_any), "`](", stringify!($try_any), "()) function.")]
        #[pin_project]
        #[must_use = "futures do nothing unless polled"]
        pub struct $TryAny<'c, $($F: Future),+> {
            $(#[pin] $f: Adapter<$F>,)+
            completed: Option<usize>,
            failed: Option<usize>,
            token: Option<&'c dyn Cancel>,
        }

        impl<'c, $($F: Future),+> $TryAny<'c, $($F),+> {
            /// Requests cancellation on `token` the moment the first child
            /// completes on the `Ok` arm.
            pub fn cancel_on_success(mut self, token: &'c dyn Cancel) -> Self {
                self.token = Some(token);
                self
            }
        }

        impl<'c, V, E, $($F: Future<Output = Result<V, E>>),+> Future for $TryAny<'c, $($F),+> {
            type Output = (usize, Result<V, E>);

            fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
                let mut this = self.project();
                let mut pending = false;
                $(
                    drive(this.$f.as_mut(), cx, $index, this.completed, this.failed, *this.token, &mut pending);
                )+
                if pending {
                    return Poll::Pending;
                }
                let decisive = match (*this.completed, *this.failed) {
                    (Some(completed), _) => completed,
                    (None, Some(failed)) => failed,
                    (None, None) => unreachable!("no child settled"),
                };
                $(
                    if decisive == $index {
                        return resolve(this.$f.as_mut(), $index);
                    }
                )+
                unreachable!("decisive child out of range");
            }
        }

        $(#[$doc])*
        pub fn $try_any<'c, V, E, $($F: Future<Output = Result<V, E>>),+>(
            $($f: $F),+
        ) -> $TryAny<'c, $($F),+> {
            $TryAny {
                $($f: Adapter::new($f),)+
                completed: None,
                failed: None,
                token: None,
            }
        }
    )*)
}

generate_try_any! {
    /// Resolves to `(index, Ok(value))` of the first of two fallible
    /// children to succeed, or `(index, Err(error))` of the fastest error
    /// when neither does.
    (TryAny2, try_any, <FutA => a @ 0, FutB => b @ 1>),

    /// Same as [`try_any`](try_any()), but for three children.
    (TryAny3, try_any3, <FutA => a @ 0, FutB => b @ 1, FutC => c @ 2>),

    /// Same as [`try_any`](try_any()), but for four children.
    (TryAny4, try_any4, <FutA => a @ 0, FutB => b @ 1, FutC => c @ 2, FutD => d @ 3>),

    /// Same as [`try_any`](try_any()), but for five children.
    (TryAny5, try_any5, <FutA => a @ 0, FutB => b @ 1, FutC => c @ 2, FutD => d @ 3, FutE => e @ 4>),
}

/// Future for the [`try_any_range`](try_any_range()) function.
#[must_use = "futures do nothing unless polled"]
pub struct TryAnyRange<'c, F: Future> {
    children: Pin<Box<[Adapter<F>]>>,
    completed: Option<usize>,
    failed: Option<usize>,
    token: Option<&'c dyn Cancel>,
}

impl<'c, F: Future> TryAnyRange<'c, F> {
    /// Requests cancellation on `token` the moment the first child succeeds.
    pub fn cancel_on_success(mut self, token: &'c dyn Cancel) -> Self {
        self.token = Some(token);
        self
    }
}

impl<'c, F: Future> std::fmt::Debug for TryAnyRange<'c, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryAnyRange").finish_non_exhaustive()
    }
}

impl<'c, V, E, F: Future<Output = Result<V, E>>> Future for TryAnyRange<'c, F> {
    type Output = (usize, Result<V, E>);

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
        let decisive = match (this.completed, this.failed) {
            (Some(completed), _) => completed,
            (None, Some(failed)) => failed,
            (None, None) => unreachable!("no child settled"),
        };
        resolve(get_pin_mut(this.children.as_mut(), decisive), decisive)
    }
}

/// Resolves to the `(index, result)` of the first fallible child in the
/// range to succeed, falling back to the fastest error.
///
/// # Panics
///
/// Panics with `"no tasks"` if the range is empty.
pub fn try_any_range<'c, I, V, E>(awaitables: I) -> TryAnyRange<'c, I::Item>
where
    I: IntoIterator,
    I::Item: Future<Output = Result<V, E>>,
{
    let children: Box<[_]> = awaitables.into_iter().map(Adapter::new).collect();
    assert!(!children.is_empty(), "no tasks");
    TryAnyRange {
        children: children.into(),
        completed: None,
        failed: None,
        token: None,
    }
}
