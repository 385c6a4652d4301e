// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_utils::OperationContext;
use dill::Catalog;
use futures::future::join_all;
use kamu_resource_versions::*;
use kamu_resource_versions_services::{DocumentStoreResourceRepository, ResourceVersionRecordStore};
use pretty_assertions::assert_eq;

use crate::helpers::RecordingEffect;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_absent_resource_version(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);

    assert_eq!(harness.version_of(b"R1").await, None);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_create_if_absent(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);

    assert!(harness.update(b"R1", b"", b"v1").await);
    assert_eq!(harness.version_of(b"R1").await, Some(b"v1".to_vec()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_duplicate_create_rejected(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);

    assert!(harness.update(b"R1", b"", b"v1").await);
    assert!(!harness.update(b"R1", b"", b"v1-duplicate").await);

    assert_eq!(harness.version_of(b"R1").await, Some(b"v1".to_vec()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_conditional_update(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);

    assert!(harness.update(b"R1", b"", b"v1").await);
    assert!(harness.update(b"R1", b"v1", b"v2").await);
    assert!(harness.update(b"R1", b"v2", b"v3").await);

    assert_eq!(harness.version_of(b"R1").await, Some(b"v3".to_vec()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_stale_update_rejected(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);

    // Nothing to update yet
    assert!(!harness.update(b"R1", b"v1", b"v2").await);
    assert_eq!(harness.version_of(b"R1").await, None);

    assert!(harness.update(b"R1", b"", b"v1").await);
    assert!(harness.update(b"R1", b"v1", b"v2").await);

    assert!(!harness.update(b"R1", b"v1", b"v3").await);
    assert_eq!(harness.version_of(b"R1").await, Some(b"v2".to_vec()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_delete_resource(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);

    assert!(harness.update(b"R1", b"", b"v1").await);
    assert!(harness.update(b"R2", b"", b"v1").await);

    harness.delete(b"R1").await;
    assert_eq!(harness.version_of(b"R1").await, None);
    assert_eq!(harness.version_of(b"R2").await, Some(b"v1".to_vec()));

    // Idempotent
    harness.delete(b"R1").await;
    assert_eq!(harness.version_of(b"R1").await, None);

    // Deleted resources start over
    assert!(!harness.update(b"R1", b"v1", b"v2").await);
    assert!(harness.update(b"R1", b"", b"v1").await);
}

pub async fn test_delete_unknown_resource(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);

    harness.delete(b"never-seen").await;
    assert_eq!(harness.version_of(b"never-seen").await, None);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_store_resource_version_unconditionally(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);
    let ctx = OperationContext::background();

    harness
        .repo
        .store_resource_version(&ctx, b"R1", b"v5")
        .await
        .unwrap();
    assert_eq!(harness.version_of(b"R1").await, Some(b"v5".to_vec()));

    // Going backwards is allowed as well
    harness
        .repo
        .store_resource_version(&ctx, b"R1", b"v1")
        .await
        .unwrap();
    assert_eq!(harness.version_of(b"R1").await, Some(b"v1".to_vec()));

    assert!(harness.update(b"R1", b"v1", b"v2").await);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_resource_ids_are_opaque(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);

    let binary_id: &[u8] = &[0x00, 0xff, 0xfe, 0x80];
    let empty_id: &[u8] = b"";

    assert!(harness.update(binary_id, b"", &[0xde, 0xad]).await);
    assert!(harness.update(empty_id, b"", b"v-empty").await);

    assert_eq!(harness.version_of(binary_id).await, Some(vec![0xde, 0xad]));
    assert_eq!(harness.version_of(empty_id).await, Some(b"v-empty".to_vec()));

    // Case and whitespace are significant
    assert_eq!(harness.version_of(b"r1").await, None);
    assert!(harness.update(b"R1", b"", b"upper").await);
    assert!(harness.update(b"r1", b"", b"lower").await);
    assert!(harness.update(b"R1 ", b"", b"padded").await);

    assert_eq!(harness.version_of(b"R1").await, Some(b"upper".to_vec()));
    assert_eq!(harness.version_of(b"r1").await, Some(b"lower".to_vec()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_handler_isolation(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);
    let other_repo = harness.repo_for_handler("<other-projection-key>");
    let ctx = OperationContext::background();

    assert!(harness.update(b"R1", b"", b"v1").await);

    assert_eq!(other_repo.resource_version(&ctx, b"R1").await.unwrap(), None);
    assert!(
        other_repo
            .update_resource_version(&ctx, b"R1", b"", b"other-v1")
            .await
            .unwrap()
    );

    other_repo.delete_resource(&ctx, b"R1").await.unwrap();

    assert_eq!(harness.version_of(b"R1").await, Some(b"v1".to_vec()));
    assert_eq!(other_repo.resource_version(&ctx, b"R1").await.unwrap(), None);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_effect_error_short_circuits(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);
    let ctx = OperationContext::background();

    assert!(harness.update(b"R1", b"", b"v1").await);

    let effect = RecordingEffect::failing("projection write rejected");
    let res = harness
        .repo
        .update_resource_version_with_effect(&ctx, b"R1", b"v1", b"v2", &effect)
        .await;

    let Err(UpdateResourceVersionWithEffectError::Effect(e)) = res else {
        panic!("Expected effect error, got: {res:?}");
    };
    assert!(
        e.reason().contains("projection write rejected"),
        "{}",
        e.reason()
    );
    assert_eq!(effect.num_calls(), 1);

    assert_eq!(harness.version_of(b"R1").await, Some(b"v1".to_vec()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_declined_effect_keeps_version(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);
    let ctx = OperationContext::background();

    let effect = RecordingEffect::declining();
    let updated = harness
        .repo
        .update_resource_version_with_effect(&ctx, b"R1", b"", b"v1", &effect)
        .await
        .unwrap();

    assert!(!updated);
    assert_eq!(effect.num_calls(), 1);
    assert_eq!(harness.version_of(b"R1").await, None);
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_effect_then_version_update(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);
    let ctx = OperationContext::background();

    let effect = RecordingEffect::proceeding();

    assert!(
        harness
            .repo
            .update_resource_version_with_effect(&ctx, b"R1", b"", b"v1", &effect)
            .await
            .unwrap()
    );
    assert!(
        harness
            .repo
            .update_resource_version_with_effect(&ctx, b"R1", b"v1", b"v2", &effect)
            .await
            .unwrap()
    );

    assert_eq!(effect.num_calls(), 2);
    assert_eq!(harness.version_of(b"R1").await, Some(b"v2".to_vec()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub async fn test_effect_kept_when_version_update_loses(catalog: &Catalog) {
    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);
    let ctx = OperationContext::background();

    assert!(harness.update(b"R1", b"", b"v1").await);
    assert!(harness.update(b"R1", b"v1", b"v2").await);

    // Replay of an already processed event
    let effect = RecordingEffect::proceeding();
    let updated = harness
        .repo
        .update_resource_version_with_effect(&ctx, b"R1", b"v1", b"v2", &effect)
        .await
        .unwrap();

    assert!(!updated);
    assert_eq!(effect.num_calls(), 1);
    assert_eq!(harness.version_of(b"R1").await, Some(b"v2".to_vec()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Writers only overlap when the backend completes writes asynchronously,
/// harnesses of backends that finish a write within one poll have to slow
/// task completion down
pub async fn test_concurrent_updates_single_winner(catalog: &Catalog) {
    const NUM_WRITERS: usize = 8;

    let harness = ResourceRepositoryTestSuiteHarness::new(catalog);
    let ctx = OperationContext::background();

    assert!(harness.update(b"R1", b"", b"v1").await);

    let new_versions: Vec<Vec<u8>> = (0..NUM_WRITERS)
        .map(|i| format!("v2-{i}").into_bytes())
        .collect();

    let results = join_all(new_versions.iter().map(|new_version| {
        harness
            .repo
            .update_resource_version(&ctx, b"R1", b"v1", new_version)
    }))
    .await;

    let winners: Vec<&Vec<u8>> = results
        .into_iter()
        .zip(new_versions.iter())
        .filter_map(|(res, new_version)| res.unwrap().then_some(new_version))
        .collect();

    assert_eq!(winners.len(), 1, "winners: {winners:?}");
    assert_eq!(harness.version_of(b"R1").await, Some(winners[0].clone()));
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Harness
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct ResourceRepositoryTestSuiteHarness {
    repo: Arc<dyn ResourceRepository>,
    document_store: Arc<dyn VersionDocumentStore>,
    task_completion_waiter: Arc<dyn TaskCompletionWaiter>,
    config: Arc<ResourceRepositoryConfig>,
}

impl ResourceRepositoryTestSuiteHarness {
    fn new(catalog: &Catalog) -> Self {
        Self {
            repo: catalog.get_one().unwrap(),
            document_store: catalog.get_one().unwrap(),
            task_completion_waiter: catalog.get_one().unwrap(),
            config: catalog.get_one().unwrap(),
        }
    }

    /// Repository of another handler sharing the same document store and index
    fn repo_for_handler(&self, handler_key: &str) -> Arc<dyn ResourceRepository> {
        let config = ResourceRepositoryConfig {
            handler_key: HandlerKey::new(handler_key),
            ..self.config.as_ref().clone()
        };

        let record_store = ResourceVersionRecordStore::new(
            self.document_store.clone(),
            self.task_completion_waiter.clone(),
            Arc::new(config),
        );

        Arc::new(DocumentStoreResourceRepository::new(Arc::new(record_store)))
    }

    async fn version_of(&self, resource_id: &[u8]) -> Option<Vec<u8>> {
        self.repo
            .resource_version(&OperationContext::background(), resource_id)
            .await
            .unwrap()
    }

    async fn update(&self, resource_id: &[u8], current_version: &[u8], new_version: &[u8]) -> bool {
        self.repo
            .update_resource_version(
                &OperationContext::background(),
                resource_id,
                current_version,
                new_version,
            )
            .await
            .unwrap()
    }

    async fn delete(&self, resource_id: &[u8]) {
        self.repo
            .delete_resource(&OperationContext::background(), resource_id)
            .await
            .unwrap();
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
