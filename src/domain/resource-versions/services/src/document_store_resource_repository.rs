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

use crate::ResourceVersionRecordStore;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct DocumentStoreResourceRepository {
    record_store: Arc<ResourceVersionRecordStore>,
}

#[dill::component(pub)]
#[dill::interface(dyn ResourceRepository)]
impl DocumentStoreResourceRepository {
    pub fn new(record_store: Arc<ResourceVersionRecordStore>) -> Self {
        Self { record_store }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl ResourceRepository for DocumentStoreResourceRepository {
    #[tracing::instrument(level = "debug", skip_all)]
    async fn resource_version(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
    ) -> Result<Option<Vec<u8>>, GetResourceVersionError> {
        let key = self.record_store.derive_key(resource_id);
        let maybe_record = self.record_store.get(ctx, &key).await?;

        Ok(maybe_record.map(|record| record.version))
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn store_resource_version(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
        version: &[u8],
    ) -> Result<(), ResourceVersionWriteError> {
        let key = self.record_store.derive_key(resource_id);

        self.record_store
            .put(
                ctx,
                ResourceVersionRecord::new(key, version),
                WritePrecondition::None,
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn update_resource_version(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
        current_version: &[u8],
        new_version: &[u8],
    ) -> Result<bool, ResourceVersionWriteError> {
        let key = self.record_store.derive_key(resource_id);
        let maybe_record = self.record_store.get(ctx, &key).await?;

        let new_record = ResourceVersionRecord::new(key, new_version);

        let updated = if current_version.is_empty() {
            if let Some(record) = maybe_record {
                tracing::debug!(
                    key = %record.id,
                    "Resource already has a version, expected none"
                );
                return Ok(false);
            }

            self.record_store
                .put(ctx, new_record, WritePrecondition::Absent)
                .await?
        } else {
            match maybe_record {
                None => {
                    tracing::debug!(key = %new_record.id, "Resource has no version yet");
                    return Ok(false);
                }
                Some(record) if record.version != current_version => {
                    tracing::debug!(key = %record.id, "Resource version does not match expected");
                    return Ok(false);
                }
                Some(_) => {
                    self.record_store
                        .replace(
                            ctx,
                            new_record,
                            WritePrecondition::VersionEquals(current_version.to_vec()),
                        )
                        .await?
                }
            }
        };

        tracing::debug!(updated, "Resource version compare-and-swap finished");

        Ok(updated)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn update_resource_version_with_effect(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
        current_version: &[u8],
        new_version: &[u8],
        effect: &dyn ResourceVersionEffect,
    ) -> Result<bool, UpdateResourceVersionWithEffectError> {
        let proceed = effect
            .apply(ctx)
            .await
            .map_err(UpdateResourceVersionWithEffectError::Effect)?;

        if !proceed {
            tracing::debug!("Effect declined, leaving resource version untouched");
            return Ok(false);
        }

        // The effect is not rolled back when the version update loses
        let updated = self
            .update_resource_version(ctx, resource_id, current_version, new_version)
            .await?;

        if !updated {
            tracing::warn!("Effect applied but resource version was not updated");
        }

        Ok(updated)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn delete_resource(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
    ) -> Result<(), ResourceVersionWriteError> {
        let key = self.record_store.derive_key(resource_id);
        self.record_store.delete(ctx, &key).await
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
