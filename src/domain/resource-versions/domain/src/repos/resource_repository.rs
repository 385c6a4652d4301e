// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_utils::{ContextError, OperationContext};
use internal_error::InternalError;
use thiserror::Error;

use crate::{TaskFailedError, WaitForTaskError};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Tracks the version of every resource a projection handler has processed.
///
/// Versions are opaque byte strings. An empty `current_version` passed to an
/// update means "the resource must not have a version yet". A version mismatch
/// is reported as `Ok(false)`, never as an error, so callers can tell a stale
/// or duplicate event apart from a failed operation.
#[async_trait::async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Returns the current version of the resource, `None` if it has none
    async fn resource_version(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
    ) -> Result<Option<Vec<u8>>, GetResourceVersionError>;

    /// Sets the version without checking the current one
    async fn store_resource_version(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
        version: &[u8],
    ) -> Result<(), ResourceVersionWriteError>;

    /// Moves the resource from `current_version` to `new_version`.
    ///
    /// Returns `false` and changes nothing when `current_version` is not the
    /// version the resource has.
    async fn update_resource_version(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
        current_version: &[u8],
        new_version: &[u8],
    ) -> Result<bool, ResourceVersionWriteError>;

    /// Applies `effect` and then moves the resource to `new_version`.
    ///
    /// When the effect fails or declines, the version is left untouched. When
    /// the version update loses against a concurrent writer, the effect has
    /// already been applied and is not rolled back: the call returns `false`
    /// and the effect is expected to converge when the event is replayed.
    async fn update_resource_version_with_effect(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
        current_version: &[u8],
        new_version: &[u8],
        effect: &dyn ResourceVersionEffect,
    ) -> Result<bool, UpdateResourceVersionWithEffectError>;

    /// Removes all information about the resource, idempotent
    async fn delete_resource(
        &self,
        ctx: &OperationContext,
        resource_id: &[u8],
    ) -> Result<(), ResourceVersionWriteError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Side effect coordinated with a version update, typically a write to the
/// projection's own documents
#[async_trait::async_trait]
pub trait ResourceVersionEffect: Send + Sync {
    /// Returns `Ok(false)` to abort the version update without an error
    async fn apply(&self, ctx: &OperationContext) -> Result<bool, InternalError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GetResourceVersionError {
    #[error(transparent)]
    Cancelled(#[from] ContextError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum ResourceVersionWriteError {
    #[error(transparent)]
    TaskFailed(#[from] TaskFailedError),

    #[error(transparent)]
    Cancelled(#[from] ContextError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<WaitForTaskError> for ResourceVersionWriteError {
    fn from(value: WaitForTaskError) -> Self {
        match value {
            WaitForTaskError::TaskFailed(e) => Self::TaskFailed(e),
            WaitForTaskError::Cancelled(e) => Self::Cancelled(e),
            WaitForTaskError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<GetResourceVersionError> for ResourceVersionWriteError {
    fn from(value: GetResourceVersionError) -> Self {
        match value {
            GetResourceVersionError::Cancelled(e) => Self::Cancelled(e),
            GetResourceVersionError::Internal(e) => Self::Internal(e),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum UpdateResourceVersionWithEffectError {
    /// Failure reported by the effect itself, propagated unchanged
    #[error(transparent)]
    Effect(InternalError),

    #[error(transparent)]
    Write(#[from] ResourceVersionWriteError),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
