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

use crate::{EnqueuedTask, TaskError, TaskUid};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Blocks until an asynchronous mutation reaches a terminal status.
///
/// This is the only place where task handles are polled: every mutation path
/// of the repository goes through it.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait::async_trait]
pub trait TaskCompletionWaiter: Send + Sync {
    async fn wait_for_task(
        &self,
        ctx: &OperationContext,
        task: EnqueuedTask,
    ) -> Result<(), WaitForTaskError>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum WaitForTaskError {
    #[error(transparent)]
    TaskFailed(#[from] TaskFailedError),

    #[error(transparent)]
    Cancelled(#[from] ContextError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Task {task_uid} failed: {error}")]
pub struct TaskFailedError {
    pub task_uid: TaskUid,
    pub error: TaskError,
}

impl TaskFailedError {
    pub fn is_precondition_failed(&self) -> bool {
        self.error.is_precondition_failed()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
