// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Identifier of an asynchronous mutation accepted by a document store
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskUid(i64);

impl TaskUid {
    pub fn new(uid: i64) -> Self {
        Self(uid)
    }

    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TaskUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Handle returned by every mutation: the work completes out-of-band and has
/// to be polled until it reaches a terminal status
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EnqueuedTask {
    pub task_uid: TaskUid,
}

impl EnqueuedTask {
    pub fn new(task_uid: TaskUid) -> Self {
        Self { task_uid }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Enqueued | Self::Processing => false,
            Self::Succeeded | Self::Failed | Self::Canceled => true,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Status snapshot of an asynchronous mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub task_uid: TaskUid,
    pub status: TaskStatus,
    /// Failure details reported by the backend, set for failed tasks
    pub error: Option<TaskError>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskErrorKind {
    /// The write precondition did not hold when the task was applied
    PreconditionFailed,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::PreconditionFailed,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: TaskErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn is_precondition_failed(&self) -> bool {
        self.kind == TaskErrorKind::PreconditionFailed
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
