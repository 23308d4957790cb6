//! Integration tests for the worker pool and panic bus.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use podcastify::panic_bus::{PanicBus, PanicMessage};
use podcastify::scheduler::{SequentialQueue, WorkerPool, WorkerPoolConfig};
use podcastify::PoolError;

#[tokio::test]
async fn test_parallelism_is_bounded_by_lane_count() {
    let pool = WorkerPool::new(&WorkerPoolConfig::new(3), PanicBus::new());
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(move || async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                i
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let values: Vec<i32> = results.into_iter().map(Result::unwrap).collect();

    assert_eq!(values, (0..12).collect::<Vec<_>>());
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(pool.stats().tasks_completed, 12);
    assert_eq!(pool.stats().active_tasks, 0);
}

#[tokio::test]
async fn test_single_lane_runs_in_submission_order() {
    let pool = WorkerPool::new(&WorkerPoolConfig::new(1), PanicBus::new());
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let order = Arc::clone(&order);
            pool.submit(move || async move {
                // Later tasks finish faster if they were allowed to overlap.
                tokio::time::sleep(Duration::from_millis(5 * (5 - i))).await;
                order.lock().unwrap().push(i);
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_panicking_task_leaves_pool_usable() {
    let pool = WorkerPool::new(&WorkerPoolConfig::new(1), PanicBus::new());

    let explode = true;
    let failed = pool
        .submit(move || async move {
            if explode {
                panic!("yt-dlp wrapper exploded");
            }
        })
        .await;
    assert!(matches!(failed, Err(PoolError::TaskPanicked(ref reason)) if reason.contains("exploded")));

    let ok = pool.submit(|| async { "still alive" }).await.unwrap();
    assert_eq!(ok, "still alive");
    assert_eq!(pool.stats().tasks_panicked, 1);
}

#[tokio::test]
async fn test_empty_pool_reports_on_panic_bus() {
    let bus = PanicBus::new();
    let received: Arc<Mutex<Vec<PanicMessage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let subscription = bus.subscribe(move |message| sink.lock().unwrap().push(message.clone()));

    let pool = WorkerPool::from_queues(Vec::<SequentialQueue>::new(), bus.clone());
    let result = pool.submit(|| async { 1 }).await;

    assert!(matches!(result, Err(PoolError::NoWorkers)));
    assert_eq!(
        *received.lock().unwrap(),
        vec![PanicMessage::new("WorkerPool", "No workers available to submit a task")]
    );

    subscription.unsubscribe();
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn test_workers_setting_drives_lane_count() {
    let pool = WorkerPool::new(&WorkerPoolConfig::from_raw(Some("2.5")), PanicBus::new());
    assert_eq!(pool.len(), 2);

    let pool = WorkerPool::new(&WorkerPoolConfig::from_raw(None), PanicBus::new());
    assert_eq!(pool.len(), WorkerPoolConfig::DEFAULT_WORKERS);
}
