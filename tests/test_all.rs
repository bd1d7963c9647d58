use futures::FutureExt;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use task_weave::{all, all3, all4, all_range, Task};

mod common;
use common::*;

#[tokio::test]
async fn two_int_tasks() {
    let (a, b) = all(int_task(10), int_task(20)).await;
    assert_eq!(a + b, 30);
}

#[tokio::test]
async fn mixed_types() {
    let (n, s) = all(int_task(42), string_task("hello")).await;
    assert_eq!(format!("{s}{n}"), "hello42");
}

#[tokio::test]
async fn mixed_unit_and_value() {
    let (a, unit, b) = all3(int_task(10), unit_task(), int_task(20)).await;
    assert_eq!((a, unit, b), (10, (), 20));
}

#[tokio::test]
async fn move_only_values() {
    let boxed = |value: i32| Task::new(async move { Box::new(value) });
    let (a, b, c) = all3(boxed(10), boxed(20), boxed(30)).await;
    assert_eq!(*a + *b + *c, 60);
}

#[tokio::test]
async fn delayed_children_run_concurrently() {
    let start = Instant::now();
    let (a, b) = all(
        delayed_int(10, Duration::from_millis(30)),
        delayed_int(20, Duration::from_millis(30)),
    )
    .await;
    assert_eq!(a + b, 30);
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn first_panics_rest_never_started() {
    let ran = Arc::new(AtomicBool::new(false));
    let payload = AssertUnwindSafe(all(panicking_task("first"), tracking_task(ran.clone(), 1)))
        .catch_unwind()
        .await
        .unwrap_err();
    assert_eq!(payload_message(&payload), "first");
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn middle_panics_later_siblings_never_started() {
    let first_ran = Arc::new(AtomicBool::new(false));
    let last_ran = Arc::new(AtomicBool::new(false));
    let payload = AssertUnwindSafe(all3(
        tracking_task(first_ran.clone(), 1),
        panicking_task("middle"),
        tracking_task(last_ran.clone(), 3),
    ))
    .catch_unwind()
    .await
    .unwrap_err();
    assert_eq!(payload_message(&payload), "middle");
    assert!(first_ran.load(Ordering::SeqCst));
    assert!(!last_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn last_panics_after_siblings_completed() {
    let ran = Arc::new(AtomicBool::new(false));
    let payload = AssertUnwindSafe(all(tracking_task(ran.clone(), 1), panicking_task("last")))
        .catch_unwind()
        .await
        .unwrap_err();
    assert_eq!(payload_message(&payload), "last");
    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn both_panic_first_recorded_wins() {
    let payload = AssertUnwindSafe(all(panicking_task("error1"), panicking_task("error2")))
        .catch_unwind()
        .await
        .unwrap_err();
    assert_eq!(payload_message(&payload), "error1");
}

#[tokio::test]
async fn fastest_async_panic_wins() {
    let payload = AssertUnwindSafe(all(
        delayed_panic("slow error", Duration::from_millis(20)),
        delayed_panic("fast error", Duration::from_millis(1)),
    ))
    .catch_unwind()
    .await
    .unwrap_err();
    assert_eq!(payload_message(&payload), "fast error");
}

#[tokio::test]
async fn started_children_drain_before_failure_surfaces() {
    let finished = Arc::new(AtomicBool::new(false));
    let seen = finished.clone();
    let slow = Task::new(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        seen.store(true, Ordering::SeqCst);
        1
    });
    let payload = AssertUnwindSafe(all(slow, panicking_task("boom")))
        .catch_unwind()
        .await
        .unwrap_err();
    assert_eq!(payload_message(&payload), "boom");
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn success_does_not_fire_the_token() {
    let token = CancellationToken::new();
    let (a, b) = all(int_task(10), int_task(20))
        .cancel_on_failure(&token)
        .await;
    assert_eq!(a + b, 30);
    assert!(!token.is_cancelled());
}

#[tokio::test]
async fn failure_fires_the_token_and_unblocks_the_sibling() {
    let token = CancellationToken::new();
    let stoppable = {
        let token = token.clone();
        Task::new(async move {
            token.cancelled().await;
            10
        })
    };
    let start = Instant::now();
    let payload = AssertUnwindSafe(all(stoppable, panicking_task("boom")).cancel_on_failure(&token))
        .catch_unwind()
        .await
        .unwrap_err();
    assert_eq!(payload_message(&payload), "boom");
    assert!(token.is_cancelled());
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn nested() {
    let inner1 = Task::new(async {
        let (a, b) = all(int_task(10), int_task(20)).await;
        a + b
    });
    let inner2 = Task::new(async {
        let (a, b) = all(int_task(30), int_task(40)).await;
        a + b
    });
    let (a, b) = all(inner1, inner2).await;
    assert_eq!(a + b, 100);
}

#[tokio::test]
async fn four_children() {
    let (a, b, c, d) = all4(int_task(1), int_task(2), int_task(3), int_task(4)).await;
    assert_eq!(a + b + c + d, 10);
}

#[tokio::test]
async fn range_empty() {
    let values = all_range(Vec::<Task<i32>>::new()).await;
    assert!(values.is_empty());
}

#[tokio::test]
async fn range_values_preserve_input_order() {
    let values = all_range(vec![
        delayed_int(20, Duration::from_millis(20)),
        delayed_int(10, Duration::from_millis(5)),
    ])
    .await;
    assert_eq!(values, vec![20, 10]);
}

#[tokio::test]
async fn range_unit_children() {
    let values = all_range(vec![unit_task(), unit_task()]).await;
    assert_eq!(values.len(), 2);
}

#[tokio::test]
async fn range_first_panics_rest_never_started() {
    let second_ran = Arc::new(AtomicBool::new(false));
    let third_ran = Arc::new(AtomicBool::new(false));
    let payload = AssertUnwindSafe(all_range(vec![
        panicking_task("error"),
        tracking_task(second_ran.clone(), 2),
        tracking_task(third_ran.clone(), 3),
    ]))
    .catch_unwind()
    .await
    .unwrap_err();
    assert_eq!(payload_message(&payload), "error");
    assert!(!second_ran.load(Ordering::SeqCst));
    assert!(!third_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn range_middle_panics() {
    let first_ran = Arc::new(AtomicBool::new(false));
    let last_ran = Arc::new(AtomicBool::new(false));
    let payload = AssertUnwindSafe(all_range(vec![
        tracking_task(first_ran.clone(), 1),
        panicking_task("error"),
        tracking_task(last_ran.clone(), 3),
    ]))
    .catch_unwind()
    .await
    .unwrap_err();
    assert_eq!(payload_message(&payload), "error");
    assert!(first_ran.load(Ordering::SeqCst));
    assert!(!last_ran.load(Ordering::SeqCst));
}
