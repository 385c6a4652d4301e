// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use sha2::{Digest, Sha256};

use crate::HandlerKey;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Document identifier of a resource version record.
///
/// Computed as the hex-encoded SHA-256 digest over the raw bytes of the
/// handler key followed by the raw bytes of the resource identifier. Inputs
/// are not normalized in any way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn derive(handler_key: &HandlerKey, resource_id: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(handler_key.as_str().as_bytes());
        hasher.update(resource_id);

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
