// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use internal_error::ErrorIntoInternal;

use crate::domain::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Number of finished tasks whose status stays queryable, older ones are
/// forgotten
pub const MAX_RETAINED_COMPLETED_TASKS: usize = 256;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Document store keeping everything in memory while reproducing the
/// asynchronous behavior of a real search engine backend.
///
/// Mutations are only queued when they are submitted. Queued tasks are
/// applied in submission order, lazily, when a task status is polled: polling
/// a task applies every task queued before it and the task itself. Write
/// preconditions are evaluated at that moment.
///
/// Fault injection knobs allow tests to simulate slow, failing, or unavailable
/// backends.
pub struct InMemoryVersionDocumentStore {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    documents_by_index: HashMap<String, BTreeMap<ResourceKey, Vec<u8>>>,
    tasks: BTreeMap<TaskUid, TaskEntry>,
    pending_tasks: VecDeque<TaskUid>,
    completed_tasks: VecDeque<TaskUid>,
    last_task_uid: i64,
    faults: Faults,
}

#[derive(Default)]
struct Faults {
    unavailable: bool,
    hold_tasks: bool,
    polls_before_completion: u32,
    fail_next_task: Option<String>,
}

struct TaskEntry {
    status: TaskStatus,
    error: Option<TaskError>,
    remaining_polls: u32,
    mutation: Option<Mutation>,
    forced_failure: Option<String>,
}

enum Mutation {
    Put {
        index: String,
        record: ResourceVersionRecord,
        precondition: WritePrecondition,
    },
    Delete {
        index: String,
        key: ResourceKey,
    },
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[dill::component(pub)]
#[dill::interface(dyn VersionDocumentStore)]
#[dill::scope(dill::Singleton)]
impl InMemoryVersionDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }
}

impl InMemoryVersionDocumentStore {
    /// Number of polls reporting a task as `Processing` before it is applied
    pub fn set_polls_before_completion(&self, num_polls: u32) {
        self.state().faults.polls_before_completion = num_polls;
    }

    /// While held, queued tasks stay `Enqueued` no matter how often polled
    pub fn hold_tasks(&self, hold: bool) {
        self.state().faults.hold_tasks = hold;
    }

    /// The next submitted mutation fails with the given detail when applied
    pub fn fail_next_task(&self, detail: impl Into<String>) {
        self.state().faults.fail_next_task = Some(detail.into());
    }

    /// While unavailable, every call fails with a transport error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().faults.unavailable = unavailable;
    }

    /// Moves a queued task to `Canceled`, as an operator of the backend would
    pub fn cancel_task(&self, task_uid: TaskUid) -> bool {
        let mut state = self.state();

        let Some(entry) = state.tasks.get_mut(&task_uid) else {
            return false;
        };
        if entry.status.is_terminal() {
            return false;
        }

        entry.status = TaskStatus::Canceled;
        entry.mutation = None;
        state.pending_tasks.retain(|uid| *uid != task_uid);
        state.retire(task_uid);

        true
    }

    pub fn num_pending_tasks(&self) -> usize {
        self.state().pending_tasks.len()
    }

    /// Pending tasks plus the finished ones still queryable
    pub fn num_retained_tasks(&self) -> usize {
        self.state().tasks.len()
    }

    pub fn num_documents(&self, index: &str) -> usize {
        self.state()
            .documents_by_index
            .get(index)
            .map_or(0, BTreeMap::len)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // State is only mutated under the lock in single steps
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, mutation: Mutation) -> Result<EnqueuedTask, DocumentStoreError> {
        let mut state = self.state();
        state.check_available()?;

        state.last_task_uid += 1;
        let task_uid = TaskUid::new(state.last_task_uid);

        let entry = TaskEntry {
            status: TaskStatus::Enqueued,
            error: None,
            remaining_polls: state.faults.polls_before_completion,
            mutation: Some(mutation),
            forced_failure: state.faults.fail_next_task.take(),
        };

        state.tasks.insert(task_uid, entry);
        state.pending_tasks.push_back(task_uid);

        tracing::trace!(%task_uid, "Task enqueued");

        Ok(EnqueuedTask::new(task_uid))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

impl State {
    fn check_available(&self) -> Result<(), DocumentStoreError> {
        if self.faults.unavailable {
            return Err(DocumentStoreError::Transport(
                BackendUnavailableError.int_err(),
            ));
        }
        Ok(())
    }

    fn task_info(&self, task_uid: TaskUid) -> Result<TaskInfo, DocumentStoreError> {
        let entry = self
            .tasks
            .get(&task_uid)
            .ok_or_else(|| TaskNotFoundError { task_uid }.int_err())?;

        Ok(TaskInfo {
            task_uid,
            status: entry.status,
            error: entry.error.clone(),
        })
    }

    /// Applies queued tasks in submission order up to and including the
    /// given one
    fn process_until(&mut self, task_uid: TaskUid) {
        while let Some(next_uid) = self.pending_tasks.front().copied() {
            if next_uid > task_uid {
                break;
            }
            self.pending_tasks.pop_front();
            self.apply(next_uid);
            self.retire(next_uid);
        }
    }

    fn retire(&mut self, task_uid: TaskUid) {
        self.completed_tasks.push_back(task_uid);

        while self.completed_tasks.len() > MAX_RETAINED_COMPLETED_TASKS {
            if let Some(oldest_uid) = self.completed_tasks.pop_front() {
                self.tasks.remove(&oldest_uid);
            }
        }
    }

    fn apply(&mut self, task_uid: TaskUid) {
        let Some(entry) = self.tasks.get_mut(&task_uid) else {
            return;
        };
        let Some(mutation) = entry.mutation.take() else {
            return;
        };

        if let Some(detail) = entry.forced_failure.take() {
            entry.status = TaskStatus::Failed;
            entry.error = Some(TaskError::other(detail));
            return;
        }

        let outcome = match mutation {
            Mutation::Put {
                index,
                record,
                precondition,
            } => {
                let documents = self.documents_by_index.entry(index).or_default();
                let current_version = documents.get(&record.id).map(Vec::as_slice);

                if precondition.holds_for(current_version) {
                    documents.insert(record.id, record.version);
                    Ok(())
                } else {
                    Err(TaskError::precondition_failed(format!(
                        "document `{}` does not satisfy precondition {precondition:?}",
                        record.id
                    )))
                }
            }
            Mutation::Delete { index, key } => {
                if let Some(documents) = self.documents_by_index.get_mut(&index) {
                    documents.remove(&key);
                }
                Ok(())
            }
        };

        let Some(entry) = self.tasks.get_mut(&task_uid) else {
            return;
        };
        match outcome {
            Ok(()) => entry.status = TaskStatus::Succeeded,
            Err(error) => {
                entry.status = TaskStatus::Failed;
                entry.error = Some(error);
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[async_trait::async_trait]
impl VersionDocumentStore for InMemoryVersionDocumentStore {
    async fn get_document(
        &self,
        index: &str,
        key: &ResourceKey,
    ) -> Result<ResourceVersionRecord, DocumentStoreError> {
        let state = self.state();
        state.check_available()?;

        state
            .documents_by_index
            .get(index)
            .and_then(|documents| documents.get(key))
            .map(|version| ResourceVersionRecord::new(key.clone(), version.clone()))
            .ok_or_else(|| {
                DocumentNotFoundError {
                    index: index.to_string(),
                    key: key.clone(),
                }
                .into()
            })
    }

    async fn add_document(
        &self,
        index: &str,
        record: ResourceVersionRecord,
        precondition: WritePrecondition,
    ) -> Result<EnqueuedTask, DocumentStoreError> {
        self.enqueue(Mutation::Put {
            index: index.to_string(),
            record,
            precondition,
        })
    }

    async fn update_document(
        &self,
        index: &str,
        record: ResourceVersionRecord,
        precondition: WritePrecondition,
    ) -> Result<EnqueuedTask, DocumentStoreError> {
        // Records carry a single field, so a partial update replaces it whole
        self.enqueue(Mutation::Put {
            index: index.to_string(),
            record,
            precondition,
        })
    }

    async fn delete_document(
        &self,
        index: &str,
        key: &ResourceKey,
    ) -> Result<EnqueuedTask, DocumentStoreError> {
        self.enqueue(Mutation::Delete {
            index: index.to_string(),
            key: key.clone(),
        })
    }

    async fn get_task(&self, task_uid: TaskUid) -> Result<TaskInfo, DocumentStoreError> {
        let mut state = self.state();
        state.check_available()?;

        let task_info = state.task_info(task_uid)?;
        if task_info.status.is_terminal() || state.faults.hold_tasks {
            return Ok(task_info);
        }

        if let Some(entry) = state.tasks.get_mut(&task_uid) {
            if entry.remaining_polls > 0 {
                entry.remaining_polls -= 1;
                entry.status = TaskStatus::Processing;
                return state.task_info(task_uid);
            }
        }

        state.process_until(task_uid);
        state.task_info(task_uid)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(thiserror::Error, Debug)]
#[error("Document store is unavailable")]
pub struct BackendUnavailableError;

#[derive(thiserror::Error, Debug)]
#[error("Task {task_uid} not found")]
pub struct TaskNotFoundError {
    pub task_uid: TaskUid,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
