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

use async_utils::OperationContext;
use kamu_resource_versions::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct TaskCompletionWaiterImpl {
    document_store: Arc<dyn VersionDocumentStore>,
    poll_interval: Duration,
}

#[dill::component(pub)]
#[dill::interface(dyn TaskCompletionWaiter)]
impl TaskCompletionWaiterImpl {
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(
        document_store: Arc<dyn VersionDocumentStore>,
        config: Arc<ResourceRepositoryConfig>,
    ) -> Self {
        Self {
            document_store,
            poll_interval: config.task_poll_interval,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl TaskCompletionWaiter for TaskCompletionWaiterImpl {
    #[tracing::instrument(level = "debug", skip_all, fields(task_uid = %task.task_uid))]
    async fn wait_for_task(
        &self,
        ctx: &OperationContext,
        task: EnqueuedTask,
    ) -> Result<(), WaitForTaskError> {
        let mut num_polls: u32 = 0;

        loop {
            let task_info = ctx
                .run(self.document_store.get_task(task.task_uid))
                .await?
                .map_err(DocumentStoreError::into_internal)?;
            num_polls += 1;

            match task_info.status {
                TaskStatus::Succeeded => {
                    tracing::debug!(num_polls, "Task succeeded");
                    return Ok(());
                }
                TaskStatus::Failed => {
                    let error = task_info
                        .error
                        .unwrap_or_else(|| TaskError::other("task failed without details"));

                    if !error.is_precondition_failed() {
                        tracing::warn!(num_polls, %error, "Task failed");
                    }

                    return Err(TaskFailedError {
                        task_uid: task.task_uid,
                        error,
                    }
                    .into());
                }
                TaskStatus::Canceled => {
                    tracing::warn!(num_polls, "Task was canceled");

                    return Err(TaskFailedError {
                        task_uid: task.task_uid,
                        error: TaskError::other("task was canceled"),
                    }
                    .into());
                }
                TaskStatus::Enqueued | TaskStatus::Processing => {
                    tracing::trace!(num_polls, status = ?task_info.status, "Task is not finished yet");
                    ctx.sleep(self.poll_interval).await?;
                }
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
