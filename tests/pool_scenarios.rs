//! Cross-crate scenarios: service, worker pool and store working together.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;

use task_manager_service::{ServiceError, TaskService};
use task_manager_storage::{TaskRecord, TaskStatus, TaskStorage};
use task_manager_worker::{PoolError, SimulatedIoExecutor, TaskPool};

use common::{CountingExecutor, Harness, wait_until};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_workers_queue_of_one_with_four_tasks() {
    let harness = Arc::new(Harness::start(
        2,
        1,
        Arc::new(SimulatedIoExecutor::new(Duration::from_millis(200))),
    ));
    let started = Instant::now();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(harness.create().await);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.count(TaskStatus::Running).await, 2);
    assert_eq!(harness.count(TaskStatus::Pending).await, 1);

    // The fourth submission has no slot until a worker frees up.
    let fourth = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move { harness.create().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!fourth.is_finished());

    ids.push(fourth.await.unwrap());
    for id in &ids {
        let task = harness.wait_terminal(id).await;
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result().unwrap()["message"], "I/O operation completed");
    }

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(390), "finished too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "finished too late: {elapsed:?}");
}

#[tokio::test]
async fn created_task_is_immediately_visible() {
    let harness = Harness::start(
        2,
        16,
        Arc::new(SimulatedIoExecutor::new(Duration::from_millis(100))),
    );

    for _ in 0..10 {
        let id = harness.create().await;
        let task = harness.service.get(&id).await.unwrap();
        assert!(
            matches!(task.status, TaskStatus::Pending | TaskStatus::Running),
            "unexpected status {}",
            task.status
        );
    }
}

#[tokio::test]
async fn cancel_right_after_create() {
    let harness = Harness::start(
        1,
        1,
        Arc::new(SimulatedIoExecutor::new(Duration::from_secs(10))),
    );

    let id = harness.create().await;
    harness.service.cancel(&id).await.unwrap();

    let task = harness.wait_terminal(&id).await;
    assert_eq!(task.status, TaskStatus::Cancelled);
    assert!(task.outcome.is_none());
    let expected = match task.started_at {
        Some(started_at) => (task.updated_at - started_at).to_std().unwrap(),
        None => Duration::ZERO,
    };
    assert_eq!(task.running_duration(Utc::now()), expected);
    assert!(expected < Duration::from_secs(1));
}

#[tokio::test]
async fn cancelled_while_queued_never_executes() {
    let executor = CountingExecutor::sleeping(Duration::from_millis(150));
    let harness = Harness::start(1, 4, executor.clone());

    let first = harness.create().await;
    wait_until(&harness.service, &first, |t| t.status == TaskStatus::Running).await;
    let second = harness.create().await;
    harness.service.cancel(&second).await.unwrap();

    assert_eq!(harness.wait_terminal(&first).await.status, TaskStatus::Completed);
    let second = harness.wait_terminal(&second).await;
    assert_eq!(second.status, TaskStatus::Cancelled);
    assert!(second.started_at.is_none());
    assert_eq!(executor.calls(), 1);
}

#[tokio::test]
async fn cancel_terminal_task_is_rejected() {
    let harness = Harness::start(
        1,
        1,
        Arc::new(SimulatedIoExecutor::new(Duration::from_millis(10))),
    );

    let id = harness.create().await;
    let done = harness.wait_terminal(&id).await;
    assert_eq!(done.status, TaskStatus::Completed);

    assert!(matches!(
        harness.service.cancel(&id).await,
        Err(ServiceError::CantCancel(_))
    ));
    assert_eq!(harness.service.get(&id).await.unwrap(), done);
}

#[tokio::test]
async fn cancel_twice_second_is_rejected() {
    let harness = Harness::start(
        1,
        1,
        Arc::new(SimulatedIoExecutor::new(Duration::from_secs(10))),
    );

    let id = harness.create().await;
    wait_until(&harness.service, &id, |t| t.status == TaskStatus::Running).await;
    harness.service.cancel(&id).await.unwrap();

    // Either the handle is gone or the record is already terminal.
    assert!(matches!(
        harness.service.cancel(&id).await,
        Err(ServiceError::CantCancel(_))
    ));
    assert_eq!(harness.wait_terminal(&id).await.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn cancel_unknown_task() {
    let harness = Harness::start(
        1,
        1,
        Arc::new(SimulatedIoExecutor::new(Duration::from_millis(10))),
    );
    assert_eq!(
        harness.service.cancel("does-not-exist").await,
        Err(ServiceError::NotFound("does-not-exist".into()))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn excess_submissions_block_instead_of_dropping() {
    let executor = CountingExecutor::sleeping(Duration::from_millis(30));
    let harness = Arc::new(Harness::start(2, 2, executor.clone()));

    let submissions = (0..12).map(|_| {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move { harness.create().await })
    });
    let ids: Vec<String> = join_all(submissions)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();
    assert_eq!(ids.len(), 12);

    for id in &ids {
        assert_eq!(harness.wait_terminal(id).await.status, TaskStatus::Completed);
    }
    assert_eq!(executor.calls(), 12);
    assert_eq!(harness.storage.task_count().await.unwrap(), 12);
}

#[tokio::test]
async fn stop_without_tasks_returns_immediately() {
    let harness = Harness::start(
        3,
        10,
        Arc::new(SimulatedIoExecutor::new(Duration::from_secs(10))),
    );

    let started = Instant::now();
    harness.pool.stop(Duration::from_secs(5)).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn stop_waits_for_in_flight_tasks() {
    let harness = Harness::start(
        3,
        10,
        Arc::new(SimulatedIoExecutor::new(Duration::from_millis(100))),
    );

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(harness.create().await);
    }
    harness.pool.stop(Duration::from_secs(5)).await.unwrap();

    for id in &ids {
        let task: TaskRecord = harness.service.get(id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }
}

#[tokio::test]
async fn stop_timeout_leaves_work_running() {
    let harness = Harness::start(
        1,
        1,
        Arc::new(SimulatedIoExecutor::new(Duration::from_secs(10))),
    );

    let id = harness.create().await;
    wait_until(&harness.service, &id, |t| t.status == TaskStatus::Running).await;

    let result = harness.pool.stop(Duration::from_millis(50)).await;
    assert_eq!(result, Err(PoolError::Timeout(Duration::from_millis(50))));
    assert_eq!(
        harness.service.get(&id).await.unwrap().status,
        TaskStatus::Running
    );

    // Queue is closed for new work.
    assert!(matches!(
        harness.service.create_task(&Default::default()).await,
        Err(ServiceError::CantSubmit(_))
    ));

    assert_eq!(harness.pool.cancel_all(), 1);
    assert_eq!(harness.wait_terminal(&id).await.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn repeated_submit_cancel_cycles_do_not_leak_handles() {
    let harness = Harness::start(
        4,
        64,
        Arc::new(SimulatedIoExecutor::new(Duration::from_secs(10))),
    );

    let mut ids = Vec::new();
    for _ in 0..50 {
        let id = harness.create().await;
        harness.service.cancel(&id).await.unwrap();
        ids.push(id);
    }
    for id in &ids {
        assert_eq!(harness.wait_terminal(id).await.status, TaskStatus::Cancelled);
    }
    assert_eq!(harness.pool.stats().in_flight, 0);
}
