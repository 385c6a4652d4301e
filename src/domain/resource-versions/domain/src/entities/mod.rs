// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod document_task;
mod handler_key;
mod resource_key;
mod resource_version_record;
mod write_precondition;

pub use document_task::*;
pub use handler_key::*;
pub use resource_key::*;
pub use resource_version_record::*;
pub use write_precondition::*;
