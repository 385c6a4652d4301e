// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_utils::OperationContext;
use internal_error::InternalError;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Application logic maintaining a projection from a stream of events of
/// type `E`.
///
/// The handler owns the projection's data and never touches resource
/// versions: [`crate::ProjectionAdaptor`] calls it only for events that
/// advance a resource to a new version.
#[async_trait::async_trait]
pub trait ProjectionMessageHandler<E>: Send + Sync
where
    E: Send + Sync,
{
    /// Updates the projection to reflect the occurrence of `event`.
    ///
    /// The same event may be handled more than once if the version update that
    /// follows it fails, so the update must converge under replay.
    async fn handle_event(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
        event: &E,
    ) -> Result<(), InternalError>;

    /// Reduces the size of the projection's data, no-op by default
    async fn compact(&self, _ctx: &OperationContext) -> Result<(), InternalError> {
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
