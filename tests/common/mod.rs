#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use task_weave::{Failure, Task};

pub fn int_task(value: i32) -> Task<i32> {
    Task::new(async move { value })
}

pub fn string_task(value: &str) -> Task<String> {
    let value = value.to_string();
    Task::new(async move { value })
}

pub fn unit_task() -> Task<()> {
    Task::new(async {})
}

pub fn panicking_task(message: &'static str) -> Task<i32> {
    Task::new(async move { panic!("{message}") })
}

pub fn delayed_int(value: i32, delay: Duration) -> Task<i32> {
    Task::new(async move {
        tokio::time::sleep(delay).await;
        value
    })
}

pub fn delayed_panic(message: &'static str, delay: Duration) -> Task<i32> {
    Task::new(async move {
        tokio::time::sleep(delay).await;
        panic!("{message}")
    })
}

/// A task that records whether it ever ran; for asserting that a sibling
/// was never started.
pub fn tracking_task(ran: Arc<AtomicBool>, value: i32) -> Task<i32> {
    Task::new(async move {
        ran.store(true, Ordering::SeqCst);
        value
    })
}

pub fn ok_task(value: i32) -> Task<Result<i32, String>> {
    Task::new(async move { Ok(value) })
}

pub fn err_task(error: &str) -> Task<Result<i32, String>> {
    let error = error.to_string();
    Task::new(async move { Err(error) })
}

pub fn delayed_err(error: &str, delay: Duration) -> Task<Result<i32, String>> {
    let error = error.to_string();
    Task::new(async move {
        tokio::time::sleep(delay).await;
        Err(error)
    })
}

pub fn panicking_result_task(message: &'static str) -> Task<Result<i32, String>> {
    Task::new(async move { panic!("{message}") })
}

pub fn payload_message(payload: &Failure) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<opaque payload>".to_string()
    }
}
