//! Structured-concurrency combinators and synchronization primitives for
//! existing runtimes.
//!
//! # What this crate is
//! `task_weave` supplies the *control-flow* layer of an async program:
//! combinators that aggregate children ([`all()`], [`any()`],
//! [`all_complete()`] and their fallible and range forms), a [`nursery()`] for
//! supervising dynamically spawned children, and two lock-free
//! synchronization objects, a one-shot [`SingleEvent`] and an async
//! [`Mutex`]. It brings no I/O, no timers and no executor; you keep your
//! runtime and your scheduling, the crate guarantees lifetime, cancellation
//! and result aggregation.
//!
//! # Start order and fail-fast
//! Combinator children are started (first polled) in argument order, and
//! a decisive event stops *starting*, never *running*: once a child of
//! [`all()`] fails, siblings that have not started yet never will, while
//! every child that did start is driven to completion before the
//! combinator resolves. No started work is silently dropped mid-flight.
//!
//! ```
//! use task_weave::{all, Task};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (a, b) = all(Task::new(async { 10 }), Task::new(async { 20 })).await;
//! assert_eq!(a + b, 30);
//! # }
//! ```
//!
//! # Failure model
//! A child fails by panicking; the payload is captured where the child
//! settles and re-raised, verbatim, at the `await` of the combinator that
//! owns it. Children returning `Result` get the `try_` families, where the
//! `Err` arm counts as a failure for short-circuiting but comes back as an
//! ordinary `Err`, and a panic still wins at the task boundary.
//! [`all_complete()`] suspends judgement entirely and reports one
//! [`Outcome`] per child.
//!
//! # Cancellation
//! The crate consumes a cancellation token rather than providing one: any
//! type implementing [`Cancel`] (implemented for
//! `tokio_util::sync::CancellationToken`) can be attached to a fail-fast
//! combinator with `cancel_on_failure` / `cancel_on_success`, and is fired
//! exactly once, on the decisive event. Cooperating children observe the
//! token and wind down through ordinary completion; timeouts are the same
//! pattern, composed from [`any()`] and a timer future of your runtime.
//!
//! # Supervised spawning
//! A [`nursery()`] runs a body future that may start fire-and-forget
//! children at any point, from any thread holding the handle:
//!
//! ```
//! use task_weave::nursery;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let hits = Arc::new(AtomicUsize::new(0));
//! let seen = hits.clone();
//! nursery(|n| async move {
//!     for _ in 0..3 {
//!         let hits = seen.clone();
//!         n.start(async move {
//!             hits.fetch_add(1, Ordering::SeqCst);
//!         });
//!     }
//! })
//! .await;
//! // the nursery resolves only after every child has run
//! assert_eq!(hits.load(Ordering::SeqCst), 3);
//! # }
//! ```
//!
//! The nursery future resolves only once the body *and* every child have
//! completed. Children are independent: their panics are
//! swallowed, and a body that wants a child's result arranges the hand-off
//! itself, typically through a [`SingleEvent`].
//!
//! # Threading
//! Children of one combinator may be woken from different OS threads; the
//! caller resumes wherever the decisive child completed. Nothing in the
//! crate pins work to a thread; re-schedule explicitly if you need
//! affinity.

pub mod all;
pub mod all_complete;
pub mod any;
pub mod cancel;
pub mod mutex;
pub mod nursery;
pub mod outcome;
pub mod single_event;
pub mod task;
pub mod try_all;
pub mod try_any;

mod adapter;

pub use all::{all, all3, all4, all5, all_range};
pub use all_complete::{
    all_complete, all_complete3, all_complete4, all_complete5, all_complete_range,
};
pub use any::{any, any3, any4, any5, any_range};
pub use cancel::Cancel;
pub use mutex::{when_locked, when_locked_by, Mutex, Schedule, SyncSchedule, UniqueLock};
pub use nursery::{nursery, Nursery, NurseryFuture};
pub use outcome::{Failure, Outcome};
pub use single_event::{EventError, Sender, SingleEvent};
pub use task::Task;
pub use try_all::{try_all, try_all3, try_all4, try_all5, try_all_range};
pub use try_any::{try_any, try_any3, try_any4, try_any5, try_any_range};
