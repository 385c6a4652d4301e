// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_utils::OperationContext;
use internal_error::InternalError;
use kamu_resource_versions::ResourceVersionEffect;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Side effect recording how often it ran, with a configurable outcome
pub(crate) struct RecordingEffect {
    outcome: Result<bool, String>,
    num_calls: AtomicUsize,
}

impl RecordingEffect {
    pub fn proceeding() -> Self {
        Self::new(Ok(true))
    }

    pub fn declining() -> Self {
        Self::new(Ok(false))
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(Err(reason.to_string()))
    }

    fn new(outcome: Result<bool, String>) -> Self {
        Self {
            outcome,
            num_calls: AtomicUsize::new(0),
        }
    }

    pub fn num_calls(&self) -> usize {
        self.num_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ResourceVersionEffect for RecordingEffect {
    async fn apply(&self, _ctx: &OperationContext) -> Result<bool, InternalError> {
        self.num_calls.fetch_add(1, Ordering::SeqCst);

        match &self.outcome {
            Ok(proceed) => Ok(*proceed),
            Err(reason) => Err(InternalError::new(reason.clone())),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
