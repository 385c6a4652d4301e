// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::ResourceKey;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Persisted shape of a resource version: the derived key and an opaque
/// application-defined version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceVersionRecord {
    pub id: ResourceKey,
    pub version: Vec<u8>,
}

impl ResourceVersionRecord {
    pub fn new(id: ResourceKey, version: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            version: version.into(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
