// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::time::Duration;

use crate::HandlerKey;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const DEFAULT_TASK_POLL_INTERVAL: Duration = Duration::from_millis(100);

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct ResourceRepositoryConfig {
    /// Identity of the handler owning the version space
    pub handler_key: HandlerKey,
    /// Name of the document store index holding version records
    pub occ_index: String,
    /// Interval between two status checks of an asynchronous mutation
    pub task_poll_interval: Duration,
}

impl ResourceRepositoryConfig {
    pub fn new(handler_key: impl Into<HandlerKey>, occ_index: impl Into<String>) -> Self {
        Self {
            handler_key: handler_key.into(),
            occ_index: occ_index.into(),
            task_poll_interval: DEFAULT_TASK_POLL_INTERVAL,
        }
    }

    pub fn with_task_poll_interval(self, task_poll_interval: Duration) -> Self {
        Self {
            task_poll_interval,
            ..self
        }
    }

    pub fn sample() -> Self {
        Self::new("<projection-key>", "projection_occ")
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
