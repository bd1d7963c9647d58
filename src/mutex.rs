//! A lock-free async mutex with a LIFO wait stack.
//!
//! One atomic pointer carries the whole state: null for *unlocked*, a
//! sentinel bit-pattern for *locked with no waiters*, or the head of a
//! stack of waiter nodes pushed by CAS. Unlock hands the lock to a waiter
//! directly, either the node recorded in the guard's own chain or the
//! head popped from the mutex, and the resumed waiter's guard inherits
//! the rest of that node's chain, so the shared pointer is only touched
//! when a holder's chain runs dry.
//!
//! Fairness is LIFO with no starvation guarantee; the trade is taken for a
//! cheap uncontended path (one CAS in, one CAS out).
//!
//! The mutex guards no data of its own. Pair it with shared state the
//! caller owns, and keep at most one [`UniqueLock`] alive per acquisition.

use futures::future::FusedFuture;
use futures::task::AtomicWaker;

use std::future::Future;
use std::pin::Pin;
use std::process;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

// Grant state of a queued waiter. The unlocker and a concurrent drop of
// the waiting future race on this field; the CAS decides who owns the lock.
const WAITING: u8 = 0;
const GRANTED: u8 = 1;
const ABANDONED: u8 = 2;

struct Node {
    // the previous stack head at push time; a sentinel or another node.
    // Written before publication, immutable afterwards.
    next: AtomicPtr<Node>,
    state: AtomicU8,
    waker: AtomicWaker,
}

fn unlocked() -> *mut Node {
    ptr::null_mut()
}

// Distinct non-null bit-pattern, never dereferenced.
fn locked() -> *mut Node {
    1usize as *mut Node
}

fn is_node(p: *mut Node) -> bool {
    !p.is_null() && p != locked()
}

/// Schedules the resumption of a waiter that has just been handed the lock.
///
/// Invoked at most once per hand-off, on the unlocking thread.
pub trait Schedule {
    /// Dispatches the waiter's waker.
    fn schedule(&self, waker: Waker);
}

/// The default scheduler: wakes the waiter synchronously on the unlocking
/// thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncSchedule;

impl Schedule for SyncSchedule {
    fn schedule(&self, waker: Waker) {
        waker.wake();
    }
}

/// A lock-free async mutual-exclusion primitive.
///
/// Acquire with [`when_locked`](when_locked()) or
/// [`when_locked_by`](when_locked_by()); the resolved [`UniqueLock`]
/// releases on drop. Waiters suspend instead of blocking the thread.
pub struct Mutex {
    list: AtomicPtr<Node>,
}

impl Mutex {
    /// Creates an unlocked mutex.
    pub const fn new() -> Self {
        Mutex {
            list: AtomicPtr::new(ptr::null_mut()),
        }
    }

    // One-shot acquisition attempt for the uncontended case; no node needed.
    fn try_lock_fast(&self) -> bool {
        self.list
            .compare_exchange(unlocked(), locked(), Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    // Acquire or enqueue. Returns true if the lock was acquired outright,
    // false if `node` is now published on the wait stack.
    fn lock_slow(&self, node: &Arc<Node>) -> bool {
        let raw = Arc::into_raw(Arc::clone(node)) as *mut Node;
        let mut snapshot = self.list.load(Ordering::Relaxed);
        loop {
            if snapshot == unlocked() {
                match self.list.compare_exchange_weak(
                    unlocked(),
                    locked(),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: the node was never published; this drops
                        // the reference reserved for the stack.
                        unsafe { drop(Arc::from_raw(raw)) };
                        return true;
                    }
                    Err(current) => {
                        snapshot = current;
                        continue;
                    }
                }
            }
            node.next.store(snapshot, Ordering::Relaxed);
            match self
                .list
                .compare_exchange_weak(snapshot, raw, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return false,
                Err(current) => snapshot = current,
            }
        }
    }

    // Pop for an unlocking holder whose chain ran dry. Returns the popped
    // head, or a non-node when the mutex is now fully unlocked.
    //
    // Unlocking an unlocked mutex is a programmer error the primitive
    // cannot recover from; it aborts the process.
    fn unlock_one(&self) -> *mut Node {
        let mut snapshot = self.list.load(Ordering::Relaxed);
        loop {
            if snapshot == unlocked() {
                process::abort();
            }
            let target = if snapshot == locked() {
                unlocked()
            } else {
                locked()
            };
            match self
                .list
                .compare_exchange_weak(snapshot, target, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    return if snapshot == locked() {
                        unlocked()
                    } else {
                        snapshot
                    }
                }
                Err(current) => snapshot = current,
            }
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Mutex::new()
    }
}

impl Drop for Mutex {
    fn drop(&mut self) {
        // Only abandoned waiters can remain: live lock futures borrow the
        // mutex and cannot outlive it. Release their stack references.
        let mut p = *self.list.get_mut();
        while is_node(p) {
            // Safety: a real head pointer is the counted reference created
            // by `Arc::into_raw` at push time.
            let node = unsafe { Arc::from_raw(p as *const Node) };
            p = node.next.load(Ordering::Relaxed);
        }
    }
}

// Release the lock held through `chain`: grant it to the first live waiter
// in the chain, falling back to the mutex once the chain runs dry.
fn hand_off<S: Schedule>(mutex: &Mutex, mut chain: *mut Node, scheduler: &S) {
    loop {
        if !is_node(chain) {
            chain = mutex.unlock_one();
            if !is_node(chain) {
                return;
            }
            continue;
        }
        // Safety: a real chain pointer is the stack's counted reference,
        // created by `Arc::into_raw` when the node was pushed; consuming it
        // here keeps the node alive for the rest of this iteration.
        let node = unsafe { Arc::from_raw(chain as *const Node) };
        let next = node.next.load(Ordering::Relaxed);
        match node
            .state
            .compare_exchange(WAITING, GRANTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                if let Some(waker) = node.waker.take() {
                    scheduler.schedule(waker);
                }
                return;
            }
            Err(_) => {
                // the waiter was dropped while queued; serve its chain
                chain = next;
            }
        }
    }
}

enum LockState {
    Init,
    Queued(Arc<Node>),
    Done,
}

/// Future for the [`when_locked`](when_locked()) and
/// [`when_locked_by`](when_locked_by()) functions.
///
/// Resolves to a [`UniqueLock`] once the mutex is acquired. Dropping the
/// future while it waits abandons the queued slot; a hand-off that races
/// the drop is resolved by passing the lock on.
#[must_use = "futures do nothing unless polled"]
pub struct LockFuture<'m, S: Schedule = SyncSchedule> {
    mutex: &'m Mutex,
    scheduler: Option<S>,
    state: LockState,
}

// nothing in the future is address-sensitive; the queued node lives on the
// heap behind an Arc
impl<'m, S: Schedule> Unpin for LockFuture<'m, S> {}

impl<'m, S: Schedule> Future for LockFuture<'m, S> {
    type Output = UniqueLock<'m, S>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &this.state {
            LockState::Done => panic!("poll after completion"),
            LockState::Init => {
                if this.mutex.try_lock_fast() {
                    this.state = LockState::Done;
                    return Poll::Ready(UniqueLock {
                        mutex: this.mutex,
                        chain: locked(),
                        scheduler: this.scheduler.take().expect("scheduler present"),
                        released: false,
                    });
                }
                let node = Arc::new(Node {
                    next: AtomicPtr::new(ptr::null_mut()),
                    state: AtomicU8::new(WAITING),
                    waker: AtomicWaker::new(),
                });
                // register before publishing, so a grant that lands between
                // the push and our return finds a waker to dispatch
                node.waker.register(cx.waker());
                if this.mutex.lock_slow(&node) {
                    this.state = LockState::Done;
                    return Poll::Ready(UniqueLock {
                        mutex: this.mutex,
                        chain: locked(),
                        scheduler: this.scheduler.take().expect("scheduler present"),
                        released: false,
                    });
                }
                this.state = LockState::Queued(node);
                Poll::Pending
            }
            LockState::Queued(node) => {
                node.waker.register(cx.waker());
                if node.state.load(Ordering::Acquire) == GRANTED {
                    let chain = node.next.load(Ordering::Relaxed);
                    this.state = LockState::Done;
                    return Poll::Ready(UniqueLock {
                        mutex: this.mutex,
                        chain,
                        scheduler: this.scheduler.take().expect("scheduler present"),
                        released: false,
                    });
                }
                Poll::Pending
            }
        }
    }
}

impl<'m, S: Schedule> FusedFuture for LockFuture<'m, S> {
    fn is_terminated(&self) -> bool {
        matches!(self.state, LockState::Done)
    }
}

impl<'m, S: Schedule> Drop for LockFuture<'m, S> {
    fn drop(&mut self) {
        if let LockState::Queued(node) = &self.state {
            if node
                .state
                .compare_exchange(WAITING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // granted concurrently; the lock is ours to release
                let chain = node.next.load(Ordering::Relaxed);
                let scheduler = self.scheduler.take().expect("scheduler present");
                hand_off(self.mutex, chain, &scheduler);
            }
        }
    }
}

/// Exclusive lock on a [`Mutex`], released on drop or by
/// [`unlock`](UniqueLock::unlock).
///
/// Move-only; at most one exists per acquisition.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct UniqueLock<'m, S: Schedule = SyncSchedule> {
    mutex: &'m Mutex,
    chain: *mut Node,
    scheduler: S,
    released: bool,
}

// Safety: `chain` points into the Arc-managed wait stack; every access to
// it is mediated by atomics, and the guard itself is never aliased.
unsafe impl<'m, S: Schedule + Send> Send for UniqueLock<'m, S> {}
unsafe impl<'m, S: Schedule + Sync> Sync for UniqueLock<'m, S> {}

impl<'m, S: Schedule> UniqueLock<'m, S> {
    /// Releases the lock now instead of at the end of scope.
    pub fn unlock(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            hand_off(self.mutex, self.chain, &self.scheduler);
        }
    }
}

impl<'m, S: Schedule> Drop for UniqueLock<'m, S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Acquires the mutex, waking the next holder synchronously on unlock.
pub fn when_locked(mutex: &Mutex) -> LockFuture<'_, SyncSchedule> {
    when_locked_by(mutex, SyncSchedule)
}

/// Acquires the mutex with a custom [`Schedule`] for resuming the waiter
/// this acquisition eventually hands the lock to.
pub fn when_locked_by<S: Schedule>(mutex: &Mutex, scheduler: S) -> LockFuture<'_, S> {
    LockFuture {
        mutex,
        scheduler: Some(scheduler),
        state: LockState::Init,
    }
}
