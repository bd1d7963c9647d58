use futures::FutureExt;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use task_weave::Task;

mod common;
use common::*;

#[tokio::test]
async fn awaiting_yields_the_value() {
    assert_eq!(int_task(42).await, 42);
}

#[test]
fn dropping_an_unstarted_task_never_runs_it() {
    let ran = Arc::new(AtomicBool::new(false));
    let task = tracking_task(ran.clone(), 1);
    drop(task);
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn body_panic_surfaces_at_the_await() {
    let task = panicking_task("late error");
    // nothing observable happens until the task is awaited
    let payload = AssertUnwindSafe(task).catch_unwind().await.unwrap_err();
    assert_eq!(payload_message(&payload), "late error");
}

#[tokio::test]
async fn settle_reports_a_value() {
    let outcome = int_task(5).settle().await;
    assert_eq!(outcome.value(), 5);
}

#[tokio::test]
async fn settle_captures_a_panic() {
    let outcome = panicking_task("kept").settle().await;
    assert!(!outcome.has_value());
    assert_eq!(payload_message(&outcome.failure().unwrap()), "kept");
}

#[tokio::test]
async fn reference_like_results_through_shared_state() {
    let cell = Arc::new(parking_lot::Mutex::new(123));
    let handle = cell.clone();
    let task = Task::new(async move { handle });
    let returned = task.await;
    *returned.lock() = 456;
    assert_eq!(*cell.lock(), 456);
}
