use futures::FutureExt;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use task_weave::{try_all, try_all3, try_all_range, Task};

mod common;
use common::*;

fn tracking_ok(ran: Arc<AtomicBool>, value: i32) -> Task<Result<i32, String>> {
    Task::new(async move {
        ran.store(true, Ordering::SeqCst);
        Ok(value)
    })
}

#[tokio::test]
async fn all_success() {
    let result = try_all3(ok_task(10), ok_task(20), ok_task(30)).await;
    assert_eq!(result, Ok((10, 20, 30)));
}

#[tokio::test]
async fn heterogeneous_values() {
    let int_child = Task::new(async { Ok::<_, String>(10) });
    let string_child = Task::new(async { Ok::<_, String>("twenty".to_string()) });
    let result = try_all(int_child, string_child).await;
    let (n, s) = result.unwrap();
    assert_eq!(n, 10);
    assert_eq!(s, "twenty");
}

#[tokio::test]
async fn first_error_stops_later_starts() {
    let second_ran = Arc::new(AtomicBool::new(false));
    let third_ran = Arc::new(AtomicBool::new(false));
    let result = try_all3(
        err_task("wrong protocol"),
        tracking_ok(second_ran.clone(), 2),
        tracking_ok(third_ran.clone(), 3),
    )
    .await;
    assert_eq!(result, Err("wrong protocol".to_string()));
    assert!(!second_ran.load(Ordering::SeqCst));
    assert!(!third_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn second_errors_after_first_ran() {
    let first_ran = Arc::new(AtomicBool::new(false));
    let third_ran = Arc::new(AtomicBool::new(false));
    let result = try_all3(
        tracking_ok(first_ran.clone(), 1),
        err_task("wrong protocol"),
        tracking_ok(third_ran.clone(), 3),
    )
    .await;
    assert_eq!(result, Err("wrong protocol".to_string()));
    assert!(first_ran.load(Ordering::SeqCst));
    assert!(!third_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn panic_wins_at_the_task_boundary() {
    let payload = AssertUnwindSafe(try_all(panicking_result_task("error1"), ok_task(1)))
        .catch_unwind()
        .await
        .unwrap_err();
    assert_eq!(payload_message(&payload), "error1");
}

#[tokio::test]
async fn first_recorded_failure_decides_between_error_and_panic() {
    // the error arm settles first, so the later panic never surfaces
    let result = try_all(err_task("wrong protocol"), panicking_result_task("error1")).await;
    assert_eq!(result, Err("wrong protocol".to_string()));
}

#[tokio::test]
async fn fastest_error_wins() {
    let result = try_all(
        delayed_err("slow", Duration::from_millis(20)),
        delayed_err("fast", Duration::from_millis(1)),
    )
    .await;
    assert_eq!(result, Err("fast".to_string()));
}

#[tokio::test]
async fn range_all_success() {
    let result = try_all_range(vec![ok_task(10), ok_task(20)]).await;
    assert_eq!(result, Ok(vec![10, 20]));
}

#[tokio::test]
async fn range_empty() {
    let result = try_all_range(Vec::<Task<Result<i32, String>>>::new()).await;
    assert_eq!(result, Ok(Vec::new()));
}

#[tokio::test]
async fn range_error_stops_later_starts() {
    let last_ran = Arc::new(AtomicBool::new(false));
    let result = try_all_range(vec![
        ok_task(1),
        err_task("wrong protocol"),
        tracking_ok(last_ran.clone(), 3),
    ])
    .await;
    assert_eq!(result, Err("wrong protocol".to_string()));
    assert!(!last_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn range_both_fail_first_recorded_wins() {
    let result = try_all_range(vec![err_task("error1"), err_task("error2")]).await;
    assert_eq!(result, Err("error1".to_string()));
}
