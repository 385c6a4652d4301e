// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;
use std::time::Duration;

use async_utils::{ContextError, OperationContext};
use dill::CatalogBuilder;
use kamu_resource_versions::*;
use kamu_resource_versions_services::TaskCompletionWaiterImpl;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const POLL_INTERVAL: Duration = Duration::from_millis(20);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_succeeds_after_several_polls() {
    let num_polls = 4;
    let harness = WaiterHarness::new(script_statuses(num_polls, TaskInfoScript::Succeeded));

    let started_at = Instant::now();
    let res = harness
        .waiter
        .wait_for_task(&OperationContext::background(), enqueued(1))
        .await;
    let elapsed = started_at.elapsed();

    assert!(res.is_ok(), "{res:?}");

    // One sleep between each pair of consecutive polls
    let expected = POLL_INTERVAL * (num_polls - 1);
    assert!(elapsed >= expected, "{elapsed:?} < {expected:?}");
    assert!(
        elapsed < expected + Duration::from_secs(1),
        "{elapsed:?} is too long"
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_succeeds_immediately_without_sleeping() {
    let harness = WaiterHarness::with_poll_interval(
        script_statuses(1, TaskInfoScript::Succeeded),
        Duration::from_secs(60),
    );

    let res = tokio::time::timeout(
        Duration::from_secs(5),
        harness
            .waiter
            .wait_for_task(&OperationContext::background(), enqueued(1)),
    )
    .await;

    assert!(matches!(res, Ok(Ok(()))), "{res:?}");
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_failure_carries_backend_detail() {
    let harness = WaiterHarness::new(script_statuses(
        2,
        TaskInfoScript::Failed(Some(TaskError::other("index `projection_occ` not found"))),
    ));

    let res = harness
        .waiter
        .wait_for_task(&OperationContext::background(), enqueued(7))
        .await;

    let Err(WaitForTaskError::TaskFailed(e)) = res else {
        panic!("Expected task failure, got: {res:?}");
    };

    assert_eq!(e.task_uid, TaskUid::new(7));
    assert!(!e.is_precondition_failed());
    assert_eq!(
        e.to_string(),
        "Task 7 failed: index `projection_occ` not found"
    );
}

#[test_log::test(tokio::test)]
async fn test_failure_without_detail() {
    let harness = WaiterHarness::new(script_statuses(1, TaskInfoScript::Failed(None)));

    let res = harness
        .waiter
        .wait_for_task(&OperationContext::background(), enqueued(3))
        .await;

    let Err(WaitForTaskError::TaskFailed(e)) = res else {
        panic!("Expected task failure, got: {res:?}");
    };
    assert_eq!(e.error.kind, TaskErrorKind::Other);
}

#[test_log::test(tokio::test)]
async fn test_precondition_failure_is_reported_as_such() {
    let harness = WaiterHarness::new(script_statuses(
        1,
        TaskInfoScript::Failed(Some(TaskError::precondition_failed("version mismatch"))),
    ));

    let res = harness
        .waiter
        .wait_for_task(&OperationContext::background(), enqueued(1))
        .await;

    assert!(
        matches!(&res, Err(WaitForTaskError::TaskFailed(e)) if e.is_precondition_failed()),
        "{res:?}"
    );
}

#[test_log::test(tokio::test)]
async fn test_canceled_task_is_a_failure() {
    let harness = WaiterHarness::new(script_statuses(2, TaskInfoScript::Canceled));

    let res = harness
        .waiter
        .wait_for_task(&OperationContext::background(), enqueued(5))
        .await;

    let Err(WaitForTaskError::TaskFailed(e)) = res else {
        panic!("Expected task failure, got: {res:?}");
    };
    assert_eq!(e.error.message, "task was canceled");
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_transport_error_while_polling_propagates() {
    let mut document_store = MockVersionDocumentStore::new();
    document_store
        .expect_get_task()
        .times(1)
        .returning(|_| {
            Err(DocumentStoreError::Transport(
                internal_error::InternalError::new(std::io::Error::other("connection reset")),
            ))
        });

    let harness = WaiterHarness::new(document_store);

    let res = harness
        .waiter
        .wait_for_task(&OperationContext::background(), enqueued(1))
        .await;

    assert!(matches!(res, Err(WaitForTaskError::Internal(_))), "{res:?}");
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_cancellation_returns_promptly() {
    let harness = WaiterHarness::with_poll_interval(never_finishing(), Duration::from_secs(60));

    let ctx = OperationContext::background();
    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ctx.cancel();
        })
    };

    let started_at = Instant::now();
    let res = harness.waiter.wait_for_task(&ctx, enqueued(1)).await;

    assert!(
        matches!(res, Err(WaitForTaskError::Cancelled(ContextError::Cancelled))),
        "{res:?}"
    );
    assert!(started_at.elapsed() < Duration::from_secs(5));

    canceller.await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_already_cancelled_context_does_not_poll() {
    let mut document_store = MockVersionDocumentStore::new();
    document_store.expect_get_task().never();

    let harness = WaiterHarness::new(document_store);

    let ctx = OperationContext::background();
    ctx.cancel();

    let res = harness.waiter.wait_for_task(&ctx, enqueued(1)).await;

    assert!(
        matches!(res, Err(WaitForTaskError::Cancelled(ContextError::Cancelled))),
        "{res:?}"
    );
}

#[test_log::test(tokio::test)]
async fn test_deadline_bounds_polling() {
    let harness = WaiterHarness::new(never_finishing());

    let ctx = OperationContext::background().with_timeout(Duration::from_millis(150));

    let started_at = Instant::now();
    let res = harness.waiter.wait_for_task(&ctx, enqueued(1)).await;

    assert!(
        matches!(
            res,
            Err(WaitForTaskError::Cancelled(ContextError::DeadlineExceeded))
        ),
        "{res:?}"
    );
    assert!(started_at.elapsed() >= Duration::from_millis(150));
    assert!(started_at.elapsed() < Duration::from_secs(5));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Harness
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct WaiterHarness {
    waiter: Arc<dyn TaskCompletionWaiter>,
}

impl WaiterHarness {
    fn new(document_store: MockVersionDocumentStore) -> Self {
        Self::with_poll_interval(document_store, POLL_INTERVAL)
    }

    fn with_poll_interval(
        document_store: MockVersionDocumentStore,
        poll_interval: Duration,
    ) -> Self {
        let mut b = CatalogBuilder::new();
        b.add_value(ResourceRepositoryConfig::sample().with_task_poll_interval(poll_interval))
            .add_value(document_store)
            .bind::<dyn VersionDocumentStore, MockVersionDocumentStore>()
            .add::<TaskCompletionWaiterImpl>();

        Self {
            waiter: b.build().get_one().unwrap(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

enum TaskInfoScript {
    Succeeded,
    Failed(Option<TaskError>),
    Canceled,
}

/// Backend reporting the task as in progress until the last of `num_polls`
/// polls, which yields the scripted terminal status
fn script_statuses(num_polls: u32, terminal: TaskInfoScript) -> MockVersionDocumentStore {
    let mut polls = 0;
    let mut terminal = Some(terminal);

    let mut document_store = MockVersionDocumentStore::new();
    document_store
        .expect_get_task()
        .times(num_polls as usize)
        .returning(move |task_uid| {
            polls += 1;

            if polls < num_polls {
                let status = if polls == 1 {
                    TaskStatus::Enqueued
                } else {
                    TaskStatus::Processing
                };
                return Ok(TaskInfo {
                    task_uid,
                    status,
                    error: None,
                });
            }

            let (status, error) = match terminal.take() {
                Some(TaskInfoScript::Succeeded) => (TaskStatus::Succeeded, None),
                Some(TaskInfoScript::Failed(error)) => (TaskStatus::Failed, error),
                Some(TaskInfoScript::Canceled) => (TaskStatus::Canceled, None),
                None => unreachable!("polled after terminal status"),
            };

            Ok(TaskInfo {
                task_uid,
                status,
                error,
            })
        });

    document_store
}

fn never_finishing() -> MockVersionDocumentStore {
    let mut document_store = MockVersionDocumentStore::new();
    document_store.expect_get_task().returning(|task_uid| {
        Ok(TaskInfo {
            task_uid,
            status: TaskStatus::Processing,
            error: None,
        })
    });
    document_store
}

fn enqueued(task_uid: i64) -> EnqueuedTask {
    EnqueuedTask::new(TaskUid::new(task_uid))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
