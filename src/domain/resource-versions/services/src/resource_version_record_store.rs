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
use kamu_resource_versions::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Reads and writes version records in the OCC index of the document store.
///
/// Every write blocks until the backend reports the mutation as finished, so
/// a successful return means the change is visible to subsequent reads.
pub struct ResourceVersionRecordStore {
    document_store: Arc<dyn VersionDocumentStore>,
    task_completion_waiter: Arc<dyn TaskCompletionWaiter>,
    config: Arc<ResourceRepositoryConfig>,
}

#[dill::component(pub)]
#[dill::scope(dill::Singleton)]
impl ResourceVersionRecordStore {
    pub fn new(
        document_store: Arc<dyn VersionDocumentStore>,
        task_completion_waiter: Arc<dyn TaskCompletionWaiter>,
        config: Arc<ResourceRepositoryConfig>,
    ) -> Self {
        Self {
            document_store,
            task_completion_waiter,
            config,
        }
    }
}

impl ResourceVersionRecordStore {
    pub fn derive_key(&self, resource_id: &[u8]) -> ResourceKey {
        ResourceKey::derive(&self.config.handler_key, resource_id)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    pub async fn get(
        &self,
        ctx: &OperationContext,
        key: &ResourceKey,
    ) -> Result<Option<ResourceVersionRecord>, GetResourceVersionError> {
        match ctx
            .run(self.document_store.get_document(&self.config.occ_index, key))
            .await?
        {
            Ok(record) => Ok(Some(record)),
            Err(DocumentStoreError::NotFound(_)) => Ok(None),
            Err(e @ DocumentStoreError::Transport(_)) => Err(e.into_internal().into()),
        }
    }

    /// Inserts or fully replaces the record.
    ///
    /// Returns `false` when the backend rejected the write because the
    /// precondition did not hold.
    #[tracing::instrument(level = "debug", skip_all, fields(key = %record.id, ?precondition))]
    pub async fn put(
        &self,
        ctx: &OperationContext,
        record: ResourceVersionRecord,
        precondition: WritePrecondition,
    ) -> Result<bool, ResourceVersionWriteError> {
        let task = ctx
            .run(
                self.document_store
                    .add_document(&self.config.occ_index, record, precondition),
            )
            .await?
            .map_err(DocumentStoreError::into_internal)?;

        self.await_conditional_write(ctx, task).await
    }

    /// Overwrites the version of an existing record.
    ///
    /// Returns `false` when the backend rejected the write because the
    /// precondition did not hold.
    #[tracing::instrument(level = "debug", skip_all, fields(key = %record.id, ?precondition))]
    pub async fn replace(
        &self,
        ctx: &OperationContext,
        record: ResourceVersionRecord,
        precondition: WritePrecondition,
    ) -> Result<bool, ResourceVersionWriteError> {
        let task = ctx
            .run(
                self.document_store
                    .update_document(&self.config.occ_index, record, precondition),
            )
            .await?
            .map_err(DocumentStoreError::into_internal)?;

        self.await_conditional_write(ctx, task).await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(%key))]
    pub async fn delete(
        &self,
        ctx: &OperationContext,
        key: &ResourceKey,
    ) -> Result<(), ResourceVersionWriteError> {
        let task = ctx
            .run(self.document_store.delete_document(&self.config.occ_index, key))
            .await?
            .map_err(DocumentStoreError::into_internal)?;

        self.task_completion_waiter.wait_for_task(ctx, task).await?;
        Ok(())
    }

    async fn await_conditional_write(
        &self,
        ctx: &OperationContext,
        task: EnqueuedTask,
    ) -> Result<bool, ResourceVersionWriteError> {
        match self.task_completion_waiter.wait_for_task(ctx, task).await {
            Ok(()) => Ok(true),
            Err(WaitForTaskError::TaskFailed(e)) if e.is_precondition_failed() => {
                tracing::debug!(task_uid = %e.task_uid, reason = %e.error, "Write precondition did not hold");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
