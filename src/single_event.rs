//! A lock-free, one-slot rendezvous between a producer and an awaiting
//! consumer.
//!
//! The usual bridge from callback-land into a future: hand the
//! [`Sender`] to the callback, `wait()` on the event. One atomic byte
//! carries the whole protocol; no allocation, no locks.

use futures::future::FusedFuture;
use futures::task::AtomicWaker;

use std::cell::UnsafeCell;
use std::future::Future;
use std::panic;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};

use crate::outcome::Failure;

const HAS_SENDER: u8 = 0x1;
const HAS_VALUE: u8 = 0x2;
const HAS_AWAITER: u8 = 0x4;

/// Misuse of a [`SingleEvent`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// A sender is already attached to this event.
    #[error("sender already exists")]
    SenderExists,
    /// The sender is gone (or never existed) and no value was sent.
    #[error("no sender")]
    NoSender,
}

enum Slot<T> {
    Empty,
    Failure(Failure),
    Value(T),
}

/// A single-shot event: one producer hand-off to one awaiting consumer.
///
/// The event itself stays put (it is used by shared reference); the
/// [`Sender`] is a move-only handle borrowed from it. The consumer side is
/// [`wait`](SingleEvent::wait), which resolves as soon as a value or
/// failure is stored, or with [`EventError::NoSender`] when the sender is
/// dropped (or was never taken) without sending.
///
/// There may be at most one consumer awaiting at a time.
pub struct SingleEvent<T> {
    state: AtomicU8,
    slot: UnsafeCell<Slot<T>>,
    waiting: AtomicWaker,
}

// Safety: the slot is written by the unique sender before HAS_VALUE is
// released and read by the unique consumer after HAS_VALUE is acquired;
// every other field is already synchronized.
unsafe impl<T: Send> Sync for SingleEvent<T> {}

impl<T> SingleEvent<T> {
    /// Creates an empty event with no sender attached.
    pub fn new() -> Self {
        SingleEvent {
            state: AtomicU8::new(0),
            slot: UnsafeCell::new(Slot::Empty),
            waiting: AtomicWaker::new(),
        }
    }

    /// Attaches the producer handle.
    ///
    /// Fails with [`EventError::SenderExists`] while another sender is
    /// attached.
    pub fn sender(&self) -> Result<Sender<'_, T>, EventError> {
        let flag = self.state.fetch_or(HAS_SENDER, Ordering::AcqRel);
        if flag & HAS_SENDER != 0 {
            return Err(EventError::SenderExists);
        }
        Ok(Sender { event: Some(self) })
    }

    /// Waits for the value.
    ///
    /// Resolves to the sent value, resumes a sent failure, or fails with
    /// [`EventError::NoSender`] when no value can arrive anymore.
    pub fn wait(&self) -> Wait<'_, T> {
        Wait {
            event: self,
            done: false,
        }
    }

    fn is_ready(flag: u8) -> bool {
        flag & HAS_VALUE != 0 || flag & HAS_SENDER == 0
    }

    fn store(&self, slot: Slot<T>) {
        // Safety: only the unique sender reaches this, exactly once, and
        // HAS_VALUE has not been set yet, so no consumer reads the slot.
        unsafe {
            *self.slot.get() = slot;
        }
        let flag = self.state.fetch_or(HAS_VALUE, Ordering::AcqRel);
        if flag & HAS_AWAITER != 0 {
            self.waiting.wake();
        }
    }
}

impl<T> Default for SingleEvent<T> {
    fn default() -> Self {
        SingleEvent::new()
    }
}

/// The producer half of a [`SingleEvent`].
///
/// Move-only and single-use: [`send`](Sender::send) and
/// [`send_failure`](Sender::send_failure) consume the sender, so sending
/// twice does not compile. Dropping the sender without sending wakes the
/// consumer with [`EventError::NoSender`].
pub struct Sender<'e, T> {
    event: Option<&'e SingleEvent<T>>,
}

impl<'e, T> std::fmt::Debug for Sender<'e, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

impl<'e, T> Sender<'e, T> {
    /// Stores the value and wakes the consumer.
    pub fn send(mut self, value: T) {
        let event = self.event.take().expect("sender already used");
        event.store(Slot::Value(value));
    }

    /// Stores a captured failure; the consumer's `wait` will resume it.
    pub fn send_failure(mut self, failure: Failure) {
        let event = self.event.take().expect("sender already used");
        event.store(Slot::Failure(failure));
    }
}

impl<'e, T> Drop for Sender<'e, T> {
    fn drop(&mut self) {
        if let Some(event) = self.event.take() {
            let flag = event.state.fetch_and(!HAS_SENDER, Ordering::AcqRel);
            if flag & HAS_VALUE != 0 {
                return;
            }
            if flag & HAS_AWAITER != 0 {
                event.waiting.wake();
            }
        }
    }
}

/// Future for the [`wait`](SingleEvent::wait) method.
#[must_use = "futures do nothing unless polled"]
pub struct Wait<'e, T> {
    event: &'e SingleEvent<T>,
    done: bool,
}

impl<'e, T> Future for Wait<'e, T> {
    type Output = Result<T, EventError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.done {
            panic!("poll after completion");
        }
        let event = this.event;

        let flag = event.state.load(Ordering::Acquire);
        if !SingleEvent::<T>::is_ready(flag) {
            event.waiting.register(cx.waker());
            let flag = event.state.fetch_or(HAS_AWAITER, Ordering::AcqRel);
            if !SingleEvent::<T>::is_ready(flag) {
                return Poll::Pending;
            }
        }

        this.done = true;
        let flag = event.state.load(Ordering::Acquire);
        if flag & HAS_VALUE == 0 {
            // ready only because the sender is gone
            return Poll::Ready(Err(EventError::NoSender));
        }
        // Safety: HAS_VALUE was observed with acquire ordering, so the
        // sender's write to the slot is visible, and we are the only
        // consumer.
        let slot = unsafe { std::mem::replace(&mut *event.slot.get(), Slot::Empty) };
        match slot {
            Slot::Value(value) => Poll::Ready(Ok(value)),
            Slot::Failure(payload) => panic::resume_unwind(payload),
            Slot::Empty => panic!("value already consumed"),
        }
    }
}

impl<'e, T> FusedFuture for Wait<'e, T> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
