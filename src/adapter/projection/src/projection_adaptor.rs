// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::marker::PhantomData;
use std::sync::Arc;

use async_utils::{ContextError, OperationContext};
use internal_error::InternalError;
use kamu_resource_versions::*;
use thiserror::Error;

use crate::ProjectionMessageHandler;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Drives a [`ProjectionMessageHandler`] with optimistic concurrency control
/// on resource versions.
///
/// Each handled event must move its resource from the version the event was
/// produced from to the next one. `false` results tell the caller the event
/// is stale or a duplicate and can be skipped.
pub struct ProjectionAdaptor<E, H> {
    resource_repository: Arc<dyn ResourceRepository>,
    handler: Arc<H>,
    _event: PhantomData<fn(&E)>,
}

impl<E, H> ProjectionAdaptor<E, H>
where
    E: Send + Sync,
    H: ProjectionMessageHandler<E>,
{
    pub fn new(resource_repository: Arc<dyn ResourceRepository>, handler: Arc<H>) -> Self {
        Self {
            resource_repository,
            handler,
            _event: PhantomData,
        }
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Applies `event` to the projection and moves the resource from
    /// `current_version` to `next_version`.
    ///
    /// The handler runs first. Returns `false` when the version update is
    /// rejected afterwards: the handler's changes are kept and the event is
    /// expected to be replayed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn handle_event(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
        current_version: &[u8],
        next_version: &[u8],
        event: &E,
    ) -> Result<bool, HandleEventError> {
        let effect = HandleEventEffect {
            handler: self.handler.as_ref(),
            resource_id,
            event,
        };

        let updated = self
            .resource_repository
            .update_resource_version_with_effect(
                ctx,
                resource_id,
                current_version,
                next_version,
                &effect,
            )
            .await?;

        if !updated {
            tracing::debug!("Event skipped or resource version moved concurrently");
        }

        Ok(updated)
    }

    pub async fn resource_version(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
    ) -> Result<Option<Vec<u8>>, GetResourceVersionError> {
        self.resource_repository
            .resource_version(ctx, resource_id)
            .await
    }

    /// Forgets the resource, no further events are expected for it
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn close_resource(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
    ) -> Result<(), ResourceVersionWriteError> {
        self.resource_repository
            .delete_resource(ctx, resource_id)
            .await
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn compact(&self, ctx: &OperationContext) -> Result<(), CompactError> {
        ctx.run(self.handler.compact(ctx))
            .await?
            .map_err(CompactError::Handler)
    }

    pub fn resource_repository(&self) -> Arc<dyn ResourceRepository> {
        self.resource_repository.clone()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

struct HandleEventEffect<'a, E, H> {
    handler: &'a H,
    resource_id: &'a [u8],
    event: &'a E,
}

#[async_trait::async_trait]
impl<E, H> ResourceVersionEffect for HandleEventEffect<'_, E, H>
where
    E: Send + Sync,
    H: ProjectionMessageHandler<E>,
{
    async fn apply(&self, ctx: &OperationContext) -> Result<bool, InternalError> {
        self.handler
            .handle_event(ctx, self.resource_id, self.event)
            .await?;

        Ok(true)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum HandleEventError {
    /// Failure of the application's handler, the event should be redelivered
    #[error(transparent)]
    Handler(InternalError),

    #[error(transparent)]
    ResourceVersion(ResourceVersionWriteError),
}

impl From<UpdateResourceVersionWithEffectError> for HandleEventError {
    fn from(value: UpdateResourceVersionWithEffectError) -> Self {
        match value {
            UpdateResourceVersionWithEffectError::Effect(e) => Self::Handler(e),
            UpdateResourceVersionWithEffectError::Write(e) => Self::ResourceVersion(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum CompactError {
    #[error(transparent)]
    Handler(InternalError),

    #[error(transparent)]
    Cancelled(#[from] ContextError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
