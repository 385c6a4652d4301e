// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod dependencies;
mod document_store_resource_repository;
mod resource_version_record_store;
mod task_completion_waiter_impl;

pub use dependencies::*;
pub use document_store_resource_repository::*;
pub use resource_version_record_store::*;
pub use task_completion_waiter_impl::*;
