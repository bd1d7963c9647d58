use futures::FutureExt;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use task_weave::{try_any, try_any3, try_any_range, Task};

mod common;
use common::*;

#[tokio::test]
async fn first_ok_wins() {
    let (index, result) = try_any(ok_task(10), ok_task(20)).await;
    assert_eq!(index, 0);
    assert_eq!(result, Ok(10));
}

#[tokio::test]
async fn ok_preferred_over_earlier_error() {
    let (index, result) = try_any(err_task("too slow"), ok_task(33)).await;
    assert_eq!(index, 1);
    assert_eq!(result, Ok(33));
}

#[tokio::test]
async fn synchronous_ok_stops_later_starts() {
    let ran = Arc::new(AtomicBool::new(false));
    let never = {
        let ran = ran.clone();
        Task::new(async move {
            ran.store(true, Ordering::SeqCst);
            Ok::<i32, String>(0)
        })
    };
    let (index, result) = try_any(ok_task(1), never).await;
    assert_eq!((index, result), (0, Ok(1)));
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn all_err_fastest_error_wins() {
    let (index, result) = try_any(
        delayed_err("slow", Duration::from_millis(20)),
        delayed_err("fast", Duration::from_millis(1)),
    )
    .await;
    assert_eq!(index, 1);
    assert_eq!(result, Err("fast".to_string()));
}

#[tokio::test]
async fn panic_as_first_failure_is_resumed() {
    let payload = AssertUnwindSafe(try_any(
        panicking_result_task("boom"),
        err_task("wrong protocol"),
    ))
    .catch_unwind()
    .await
    .unwrap_err();
    assert_eq!(payload_message(&payload), "boom");
}

#[tokio::test]
async fn error_as_first_failure_hides_later_panic() {
    let (index, result) = try_any3(
        err_task("first error"),
        panicking_result_task("boom"),
        delayed_err("late", Duration::from_millis(10)),
    )
    .await;
    assert_eq!(index, 0);
    assert_eq!(result, Err("first error".to_string()));
}

#[tokio::test]
async fn faster_ok_wins() {
    let slow = Task::new(async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<i32, String>(1)
    });
    let fast = Task::new(async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok::<i32, String>(2)
    });
    let (index, result) = try_any(slow, fast).await;
    assert_eq!((index, result), (1, Ok(2)));
}

#[tokio::test]
async fn move_only_ok_value() {
    let (index, result) = try_any(
        Task::new(async { Ok::<_, String>(Box::new(5)) }),
        Task::new(async { Err::<Box<i32>, _>("nope".to_string()) }),
    )
    .await;
    assert_eq!(index, 0);
    assert_eq!(*result.unwrap(), 5);
}

#[tokio::test]
async fn range_ok_with_index() {
    let (index, result) = try_any_range(vec![err_task("nope"), ok_task(70), ok_task(80)]).await;
    assert_eq!(index, 1);
    assert_eq!(result, Ok(70));
}

#[tokio::test]
async fn range_all_err() {
    let (index, result) = try_any_range(vec![err_task("error1"), err_task("error2")]).await;
    assert_eq!(index, 0);
    assert_eq!(result, Err("error1".to_string()));
}

#[test]
fn range_empty_is_a_contract_violation() {
    let result =
        std::panic::catch_unwind(|| try_any_range(Vec::<Task<Result<i32, String>>>::new()));
    let payload = result.unwrap_err();
    assert_eq!(payload_message(&payload), "no tasks");
}
