use super::*;
use std::sync::atomic::AtomicU32;

fn counter_task(
    counter: Arc<AtomicU32>,
) -> impl Fn() -> futures::future::Ready<()> + Send + Sync + 'static {
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_register_runs_periodically() {
    let scheduler = TaskScheduler::new();
    let counter = Arc::new(AtomicU32::new(0));

    let registration = scheduler
        .register("count", counter_task(counter.clone()), 1, Duration::from_secs(1))
        .unwrap();
    assert_eq!(registration, Registration::Started);

    tokio::time::sleep(Duration::from_millis(3500)).await;

    // Ticks at 0s, 1s, 2s and 3s.
    let runs = counter.load(Ordering::SeqCst);
    assert!((3..=4).contains(&runs), "runs = {}", runs);
    let info = scheduler.task_info("count").unwrap();
    assert_eq!(info.runs, runs as u64);
    assert!(info.last_started_at.is_some());

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_task_names_snapshot() {
    let scheduler = TaskScheduler::new();
    let counter = Arc::new(AtomicU32::new(0));

    scheduler
        .register("a", counter_task(counter.clone()), 1, Duration::from_secs(1))
        .unwrap();
    scheduler
        .register("b", counter_task(counter.clone()), 1, Duration::from_secs(1))
        .unwrap();

    let mut names = scheduler.task_names();
    names.sort();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(scheduler.len(), 2);
    assert!(scheduler.contains("a"));

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_reregister_same_schedule_keeps_timer() {
    let scheduler = TaskScheduler::new();
    let first = Arc::new(AtomicU32::new(0));
    let second = Arc::new(AtomicU32::new(0));

    scheduler
        .register("task", counter_task(first.clone()), 1, Duration::from_secs(1))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let registered_at = scheduler.task_info("task").unwrap().registered_at;
    let runs_before = scheduler.task_info("task").unwrap().runs;

    let registration = scheduler
        .register("task", counter_task(second.clone()), 1, Duration::from_secs(1))
        .unwrap();
    assert_eq!(registration, Registration::Updated);

    tokio::time::sleep(Duration::from_millis(2000)).await;

    let info = scheduler.task_info("task").unwrap();
    assert_eq!(info.registered_at, registered_at);
    assert!(info.runs > runs_before);
    assert!(second.load(Ordering::SeqCst) >= 1);
    assert_eq!(first.load(Ordering::SeqCst) as u64, runs_before);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_reregister_new_interval_restarts() {
    let scheduler = TaskScheduler::new();
    let counter = Arc::new(AtomicU32::new(0));

    scheduler
        .register("task", counter_task(counter.clone()), 1, Duration::from_secs(1))
        .unwrap();
    let registration = scheduler
        .register("task", counter_task(counter.clone()), 1, Duration::from_secs(10))
        .unwrap();
    assert_eq!(registration, Registration::Restarted);
    assert_eq!(
        scheduler.task_info("task").unwrap().interval,
        Duration::from_secs(10)
    );
    assert_eq!(scheduler.len(), 1);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_del_stops_future_ticks() {
    let scheduler = TaskScheduler::new();
    let counter = Arc::new(AtomicU32::new(0));

    scheduler
        .register("task", counter_task(counter.clone()), 1, Duration::from_secs(1))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(scheduler.del("task"));
    assert!(!scheduler.del("task"));
    let after_del = counter.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(counter.load(Ordering::SeqCst), after_del);
    assert!(scheduler.task_info("task").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_del_does_not_interrupt_running_execution() {
    let scheduler = TaskScheduler::new();
    let finished = Arc::new(AtomicBool::new(false));

    let flag = finished.clone();
    scheduler
        .register(
            "slow",
            move || {
                let flag = flag.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    flag.store(true, Ordering::SeqCst);
                }
            },
            1,
            Duration::from_secs(60),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(scheduler.del("slow"));

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_limit_skips_overlapping_ticks() {
    let scheduler = TaskScheduler::new();
    let started = Arc::new(AtomicU32::new(0));

    let count = started.clone();
    scheduler
        .register(
            "slow",
            move || {
                let count = count.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
            },
            1,
            Duration::from_secs(1),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(started.load(Ordering::SeqCst), 1);
    let info = scheduler.task_info("slow").unwrap();
    assert_eq!(info.in_flight, 1);
    assert!(info.skipped_ticks >= 2);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_panicking_task_stays_registered() {
    let scheduler = TaskScheduler::new();
    let healthy = Arc::new(AtomicU32::new(0));

    scheduler
        .register(
            "boom",
            || async {
                panic!("task exploded");
            },
            1,
            Duration::from_secs(1),
        )
        .unwrap();
    scheduler
        .register("healthy", counter_task(healthy.clone()), 1, Duration::from_secs(1))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;

    let info = scheduler.task_info("boom").unwrap();
    assert!(info.panics >= 2);
    assert_eq!(info.in_flight, 0);
    assert!(healthy.load(Ordering::SeqCst) >= 2);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_register_from_inside_task() {
    let scheduler = Arc::new(TaskScheduler::new());
    let child_runs = Arc::new(AtomicU32::new(0));

    let inner = scheduler.clone();
    let runs = child_runs.clone();
    scheduler
        .register(
            "parent",
            move || {
                let inner = inner.clone();
                let runs = runs.clone();
                async move {
                    let _ = inner.register("child", counter_task(runs), 1, Duration::from_secs(1));
                }
            },
            1,
            Duration::from_secs(1),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert!(scheduler.contains("child"));
    assert!(child_runs.load(Ordering::SeqCst) >= 2);

    scheduler.stop();
}

#[tokio::test]
async fn test_rejects_invalid_registration() {
    let scheduler = TaskScheduler::new();

    let result = scheduler.register("zero", || async {}, 1, Duration::ZERO);
    assert_eq!(result, Err(SchedulerError::InvalidInterval("zero".to_string())));

    let result = scheduler.register("none", || async {}, 0, Duration::from_secs(1));
    assert_eq!(result, Err(SchedulerError::InvalidConcurrency("none".to_string())));

    assert!(scheduler.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_everything() {
    let scheduler = TaskScheduler::new();
    let counter = Arc::new(AtomicU32::new(0));
    let token = scheduler.shutdown_token();

    scheduler
        .register("task", counter_task(counter.clone()), 1, Duration::from_secs(1))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    scheduler.stop();
    assert!(!scheduler.is_running());
    assert!(scheduler.is_empty());
    assert!(token.is_cancelled());

    let after_stop = counter.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(counter.load(Ordering::SeqCst), after_stop);

    let result = scheduler.register("late", || async {}, 1, Duration::from_secs(1));
    assert_eq!(result, Err(SchedulerError::Stopped));
}

#[tokio::test(start_paused = true)]
async fn test_restart_keeps_running_execution_under_limit() {
    let scheduler = TaskScheduler::new();
    let running = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));

    let slow_task = |running: Arc<AtomicU32>, peak: Arc<AtomicU32>| {
        move || {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
        }
    };

    scheduler
        .register(
            "slow",
            slow_task(running.clone(), peak.clone()),
            1,
            Duration::from_secs(10),
        )
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(running.load(Ordering::SeqCst), 1);

    let registration = scheduler
        .register(
            "slow",
            slow_task(running.clone(), peak.clone()),
            1,
            Duration::from_secs(5),
        )
        .unwrap();
    assert_eq!(registration, Registration::Restarted);

    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(scheduler.task_info("slow").unwrap().skipped_ticks >= 1);

    scheduler.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_register_racing_stop_leaves_registry_empty() {
    let scheduler = Arc::new(TaskScheduler::new());

    let mut handles = Vec::new();
    for worker in 0..8 {
        let scheduler = scheduler.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..200 {
                let name = format!("task-{}-{}", worker, i);
                if scheduler
                    .register(name, || async {}, 1, Duration::from_secs(60))
                    .is_err()
                {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::task::yield_now().await;
    scheduler.stop();

    for handle in handles {
        handle.await.unwrap();
    }

    assert!(scheduler.is_empty());
    assert_eq!(
        scheduler.register("late", || async {}, 1, Duration::from_secs(1)),
        Err(SchedulerError::Stopped)
    );
}
