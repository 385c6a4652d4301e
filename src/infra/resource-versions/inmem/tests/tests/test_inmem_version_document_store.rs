// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use kamu_resource_versions_inmem::{InMemoryVersionDocumentStore, MAX_RETAINED_COMPLETED_TASKS};
use kamu_resource_versions_inmem::domain::*;
use pretty_assertions::assert_eq;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const INDEX: &str = "projection_occ";

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_missing_document_is_not_found() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    let res = store.get_document(INDEX, &key).await;

    let Err(e) = res else {
        panic!("Expected not found, got: {res:?}");
    };
    assert!(e.is_not_found());
    assert_eq!(
        e.to_string(),
        format!("Document '{key}' not found in index '{INDEX}'")
    );
}

#[test_log::test(tokio::test)]
async fn test_writes_become_visible_once_task_is_polled() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    let task = store
        .add_document(INDEX, record(&key, b"v1"), WritePrecondition::None)
        .await
        .unwrap();

    assert!(store.get_document(INDEX, &key).await.unwrap_err().is_not_found());
    assert_eq!(store.num_pending_tasks(), 1);

    let info = store.get_task(task.task_uid).await.unwrap();
    assert_eq!(info.status, TaskStatus::Succeeded);
    assert_eq!(info.error, None);

    assert_eq!(
        store.get_document(INDEX, &key).await.unwrap(),
        record(&key, b"v1")
    );
    assert_eq!(store.num_documents(INDEX), 1);
}

#[test_log::test(tokio::test)]
async fn test_tasks_applied_in_submission_order() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    let t1 = store
        .add_document(INDEX, record(&key, b"v1"), WritePrecondition::None)
        .await
        .unwrap();
    let t2 = store
        .update_document(INDEX, record(&key, b"v2"), WritePrecondition::None)
        .await
        .unwrap();
    let t3 = store.delete_document(INDEX, &key).await.unwrap();
    let t4 = store
        .add_document(INDEX, record(&key, b"v4"), WritePrecondition::Absent)
        .await
        .unwrap();

    assert!(t1.task_uid < t2.task_uid);

    // Polling the third task applies the two before it as well
    assert_eq!(
        store.get_task(t3.task_uid).await.unwrap().status,
        TaskStatus::Succeeded
    );
    assert_eq!(
        store.get_task(t1.task_uid).await.unwrap().status,
        TaskStatus::Succeeded
    );
    assert_eq!(store.num_pending_tasks(), 1);
    assert!(store.get_document(INDEX, &key).await.unwrap_err().is_not_found());

    assert_eq!(
        store.get_task(t4.task_uid).await.unwrap().status,
        TaskStatus::Succeeded
    );
    assert_eq!(
        store.get_document(INDEX, &key).await.unwrap(),
        record(&key, b"v4")
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_preconditions_evaluated_when_applied() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    // Both accepted while the document is absent
    let t1 = store
        .add_document(INDEX, record(&key, b"v1"), WritePrecondition::Absent)
        .await
        .unwrap();
    let t2 = store
        .add_document(INDEX, record(&key, b"v1-other"), WritePrecondition::Absent)
        .await
        .unwrap();
    let t3 = store
        .update_document(
            INDEX,
            record(&key, b"v2"),
            WritePrecondition::VersionEquals(b"v1".to_vec()),
        )
        .await
        .unwrap();
    let t4 = store
        .update_document(
            INDEX,
            record(&key, b"v3"),
            WritePrecondition::VersionEquals(b"v1".to_vec()),
        )
        .await
        .unwrap();

    let i4 = store.get_task(t4.task_uid).await.unwrap();
    let i1 = store.get_task(t1.task_uid).await.unwrap();
    let i2 = store.get_task(t2.task_uid).await.unwrap();
    let i3 = store.get_task(t3.task_uid).await.unwrap();

    assert_eq!(i1.status, TaskStatus::Succeeded);
    assert_eq!(i2.status, TaskStatus::Failed);
    assert!(i2.error.as_ref().unwrap().is_precondition_failed());
    assert_eq!(i3.status, TaskStatus::Succeeded);
    assert_eq!(i4.status, TaskStatus::Failed);
    assert!(i4.error.as_ref().unwrap().is_precondition_failed());

    assert_eq!(
        store.get_document(INDEX, &key).await.unwrap(),
        record(&key, b"v2")
    );
}

#[test_log::test(tokio::test)]
async fn test_version_precondition_on_missing_document_fails() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    let task = store
        .update_document(
            INDEX,
            record(&key, b"v2"),
            WritePrecondition::VersionEquals(b"v1".to_vec()),
        )
        .await
        .unwrap();

    let info = store.get_task(task.task_uid).await.unwrap();
    assert_eq!(info.status, TaskStatus::Failed);
    assert!(info.error.unwrap().is_precondition_failed());
    assert_eq!(store.num_documents(INDEX), 0);
}

#[test_log::test(tokio::test)]
async fn test_deleting_missing_document_succeeds() {
    let store = InMemoryVersionDocumentStore::new();

    let task = store
        .delete_document("unknown_index", &key_of(b"R1"))
        .await
        .unwrap();

    assert_eq!(
        store.get_task(task.task_uid).await.unwrap().status,
        TaskStatus::Succeeded
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test_log::test(tokio::test)]
async fn test_polls_before_completion() {
    let store = InMemoryVersionDocumentStore::new();
    store.set_polls_before_completion(2);

    let task = store
        .add_document(INDEX, record(&key_of(b"R1"), b"v1"), WritePrecondition::None)
        .await
        .unwrap();

    let statuses = [
        store.get_task(task.task_uid).await.unwrap().status,
        store.get_task(task.task_uid).await.unwrap().status,
        store.get_task(task.task_uid).await.unwrap().status,
        store.get_task(task.task_uid).await.unwrap().status,
    ];

    assert_eq!(
        statuses,
        [
            TaskStatus::Processing,
            TaskStatus::Processing,
            TaskStatus::Succeeded,
            TaskStatus::Succeeded,
        ]
    );
}

#[test_log::test(tokio::test)]
async fn test_held_tasks_stay_enqueued() {
    let store = InMemoryVersionDocumentStore::new();
    store.hold_tasks(true);

    let task = store
        .add_document(INDEX, record(&key_of(b"R1"), b"v1"), WritePrecondition::None)
        .await
        .unwrap();

    for _ in 0..3 {
        assert_eq!(
            store.get_task(task.task_uid).await.unwrap().status,
            TaskStatus::Enqueued
        );
    }

    store.hold_tasks(false);
    assert_eq!(
        store.get_task(task.task_uid).await.unwrap().status,
        TaskStatus::Succeeded
    );
}

#[test_log::test(tokio::test)]
async fn test_fail_next_task_affects_one_task() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    store.fail_next_task("disk full");

    let t1 = store
        .add_document(INDEX, record(&key, b"v1"), WritePrecondition::None)
        .await
        .unwrap();
    let t2 = store
        .add_document(INDEX, record(&key, b"v2"), WritePrecondition::None)
        .await
        .unwrap();

    let i1 = store.get_task(t1.task_uid).await.unwrap();
    assert_eq!(i1.status, TaskStatus::Failed);
    assert_eq!(i1.error, Some(TaskError::other("disk full")));

    let i2 = store.get_task(t2.task_uid).await.unwrap();
    assert_eq!(i2.status, TaskStatus::Succeeded);

    assert_eq!(
        store.get_document(INDEX, &key).await.unwrap(),
        record(&key, b"v2")
    );
}

#[test_log::test(tokio::test)]
async fn test_cancel_task() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    let task = store
        .add_document(INDEX, record(&key, b"v1"), WritePrecondition::None)
        .await
        .unwrap();

    assert!(store.cancel_task(task.task_uid));
    assert!(!store.cancel_task(task.task_uid));
    assert_eq!(store.num_pending_tasks(), 0);

    assert_eq!(
        store.get_task(task.task_uid).await.unwrap().status,
        TaskStatus::Canceled
    );
    assert!(store.get_document(INDEX, &key).await.unwrap_err().is_not_found());
}

#[test_log::test(tokio::test)]
async fn test_completed_task_history_is_bounded() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    let mut task_uids = Vec::new();
    for i in 0..1000 {
        let version = format!("v{i}");
        let task = store
            .add_document(INDEX, record(&key, version.as_bytes()), WritePrecondition::None)
            .await
            .unwrap();
        assert_eq!(
            store.get_task(task.task_uid).await.unwrap().status,
            TaskStatus::Succeeded
        );
        task_uids.push(task.task_uid);
    }

    assert_eq!(store.num_documents(INDEX), 1);
    assert_eq!(store.num_retained_tasks(), MAX_RETAINED_COMPLETED_TASKS);

    // Most recent tasks stay queryable, the oldest are forgotten
    let last_uid = *task_uids.last().unwrap();
    assert_eq!(
        store.get_task(last_uid).await.unwrap().status,
        TaskStatus::Succeeded
    );
    assert!(matches!(
        store.get_task(task_uids[0]).await,
        Err(DocumentStoreError::Transport(_))
    ));
}

#[test_log::test(tokio::test)]
async fn test_only_finished_tasks_are_forgotten() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    let held = store
        .add_document(INDEX, record(&key, b"held"), WritePrecondition::None)
        .await
        .unwrap();

    for i in 0..(MAX_RETAINED_COMPLETED_TASKS + 10) {
        let other_key = key_of(format!("R{i}-other").as_bytes());
        let task = store
            .add_document(INDEX, record(&other_key, b"v1"), WritePrecondition::None)
            .await
            .unwrap();
        store.get_task(task.task_uid).await.unwrap();
    }

    // Applied along with the later tasks, then retired first
    assert!(matches!(
        store.get_task(held.task_uid).await,
        Err(DocumentStoreError::Transport(_))
    ));
    assert_eq!(
        store.get_document(INDEX, &key).await.unwrap(),
        record(&key, b"held")
    );

    let unpolled = store
        .add_document(INDEX, record(&key, b"last"), WritePrecondition::None)
        .await
        .unwrap();
    assert_eq!(
        store.num_retained_tasks(),
        MAX_RETAINED_COMPLETED_TASKS + 1
    );
    assert_eq!(
        store.get_task(unpolled.task_uid).await.unwrap().status,
        TaskStatus::Succeeded
    );
}

#[test_log::test(tokio::test)]
async fn test_unknown_task_is_a_transport_error() {
    let store = InMemoryVersionDocumentStore::new();

    let res = store.get_task(TaskUid::new(42)).await;

    assert!(
        matches!(res, Err(DocumentStoreError::Transport(_))),
        "{res:?}"
    );
}

#[test_log::test(tokio::test)]
async fn test_unavailable_store() {
    let store = InMemoryVersionDocumentStore::new();
    let key = key_of(b"R1");

    let task = store
        .add_document(INDEX, record(&key, b"v1"), WritePrecondition::None)
        .await
        .unwrap();

    store.set_unavailable(true);

    assert!(matches!(
        store.get_document(INDEX, &key).await,
        Err(DocumentStoreError::Transport(_))
    ));
    assert!(matches!(
        store.delete_document(INDEX, &key).await,
        Err(DocumentStoreError::Transport(_))
    ));
    assert!(matches!(
        store.get_task(task.task_uid).await,
        Err(DocumentStoreError::Transport(_))
    ));

    store.set_unavailable(false);
    assert_eq!(
        store.get_task(task.task_uid).await.unwrap().status,
        TaskStatus::Succeeded
    );
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn key_of(resource_id: &[u8]) -> ResourceKey {
    ResourceKey::derive(&HandlerKey::new("<projection-key>"), resource_id)
}

fn record(key: &ResourceKey, version: &[u8]) -> ResourceVersionRecord {
    ResourceVersionRecord::new(key.clone(), version)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
