use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use task_weave::{all, any, nursery, Task};

#[tokio::main]
async fn main() {
    // fail-fast aggregation: children start in argument order and the
    // caller gets both values back as a tuple
    let (a, b) = all(
        Task::new(async { 10 }),
        Task::new(async {
            sleep(Duration::from_millis(5)).await;
            20
        }),
    )
    .await;
    println!("all finished: {} + {} = {}", a, b, a + b);

    // first-success selection: the faster child decides, with its index
    let (index, value) = any(
        Task::new(async {
            sleep(Duration::from_millis(50)).await;
            "slow"
        }),
        Task::new(async {
            sleep(Duration::from_millis(5)).await;
            "fast"
        }),
    )
    .await;
    println!("any finished: child {} answered {:?}", index, value);

    // supervised spawning: the nursery resolves only after the body and
    // every started child have completed, even though the body returns
    // while the children are still sleeping
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = hits.clone();
    nursery(|n| async move {
        for delay in [15u64, 5, 10] {
            let hits = seen.clone();
            n.start(async move {
                sleep(Duration::from_millis(delay)).await;
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        println!("parent body is done; children are still running");
    })
    .await;
    println!("nursery finished: {} children completed", hits.load(Ordering::SeqCst));
}
