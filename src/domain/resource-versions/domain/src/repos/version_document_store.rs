// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use internal_error::{ErrorIntoInternal, InternalError};
use thiserror::Error;

use crate::{EnqueuedTask, ResourceKey, ResourceVersionRecord, TaskInfo, TaskUid, WritePrecondition};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Narrow view of a document database that completes mutations
/// asynchronously.
///
/// Every mutation returns an [`EnqueuedTask`] which is not guaranteed to be
/// applied until [`VersionDocumentStore::get_task`] reports a terminal status
/// for it. Implementations must apply tasks touching the same document in the
/// order they were accepted.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait::async_trait]
pub trait VersionDocumentStore: Send + Sync {
    async fn get_document(
        &self,
        index: &str,
        key: &ResourceKey,
    ) -> Result<ResourceVersionRecord, DocumentStoreError>;

    /// Inserts the document or replaces it entirely
    async fn add_document(
        &self,
        index: &str,
        record: ResourceVersionRecord,
        precondition: WritePrecondition,
    ) -> Result<EnqueuedTask, DocumentStoreError>;

    /// Overwrites fields of an existing document
    async fn update_document(
        &self,
        index: &str,
        record: ResourceVersionRecord,
        precondition: WritePrecondition,
    ) -> Result<EnqueuedTask, DocumentStoreError>;

    /// Removes the document; removing a missing document succeeds
    async fn delete_document(
        &self,
        index: &str,
        key: &ResourceKey,
    ) -> Result<EnqueuedTask, DocumentStoreError>;

    async fn get_task(&self, task_uid: TaskUid) -> Result<TaskInfo, DocumentStoreError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Backend failures, classified by the backend itself so callers never have
/// to inspect backend-specific error types or status codes
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    #[error(transparent)]
    NotFound(#[from] DocumentNotFoundError),

    #[error(transparent)]
    Transport(#[from] InternalError),
}

impl DocumentStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Transport errors are returned as they are, without another wrapping
    pub fn into_internal(self) -> InternalError {
        match self {
            Self::Transport(e) => e,
            e @ Self::NotFound(_) => e.int_err(),
        }
    }
}

#[derive(Error, Debug)]
#[error("Document '{key}' not found in index '{index}'")]
pub struct DocumentNotFoundError {
    pub index: String,
    pub key: ResourceKey,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
